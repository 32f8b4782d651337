//! End-to-end rename invocations.

mod common;

use common::{
    archive_paths, build_archive, build_archive_bytes, csv_mapping, patch_bytes, read_archive,
};
use ziprename::{
    Compression, CoreError, MappingFormat, MemoryReader, ProcessOptions, RenameOutcome,
    ZipExtractor, process, process_with_options, template,
};
use std::sync::Arc;

fn renamed(old: &str, new: &str) -> RenameOutcome {
    RenameOutcome::Renamed {
        old: old.into(),
        new: new.into(),
    }
}

fn skipped(old: &str, new: &str) -> RenameOutcome {
    RenameOutcome::SkippedTargetExists {
        old: old.into(),
        new: new.into(),
    }
}

fn not_found(old: &str) -> RenameOutcome {
    RenameOutcome::NotFound { old: old.into() }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn renames_root_file_and_leaves_others() {
    let archive = build_archive(&[("photo.jpg", "sun"), ("docs/report.jpg", "numbers")]);
    let mapping = csv_mapping(&[("photo.jpg", "vacation.jpg")]);

    let output = process(archive, mapping, MappingFormat::DelimitedText)
        .await
        .unwrap();

    assert_eq!(output.log, [renamed("photo.jpg", "vacation.jpg")]);
    let contents = read_archive(output.archive).await;
    assert_eq!(
        contents.keys().collect::<Vec<_>>(),
        ["docs/report.jpg", "vacation.jpg"]
    );
    assert_eq!(contents["vacation.jpg"].as_deref(), Some(&b"sun"[..]));
}

#[tokio::test]
async fn existing_target_is_not_overwritten() {
    let archive = build_archive(&[("a.txt", "first"), ("b.txt", "second")]);
    let mapping = csv_mapping(&[("a.txt", "b.txt")]);

    let output = process(archive, mapping, MappingFormat::DelimitedText)
        .await
        .unwrap();

    assert_eq!(output.log, [skipped("a.txt", "b.txt")]);
    let contents = read_archive(output.archive).await;
    assert_eq!(contents["a.txt"].as_deref(), Some(&b"first"[..]));
    assert_eq!(contents["b.txt"].as_deref(), Some(&b"second"[..]));
}

#[tokio::test]
async fn empty_mapping_reproduces_archive() {
    let entries: &[(&str, &[u8])] = &[
        ("a.txt", &b"alpha"[..]),
        ("nested/", &b""[..]),
        ("nested/deep/b.bin", &b"\x00\x01\x02\x03\xff"[..]),
    ];
    let archive = build_archive_bytes(entries);

    let output = process(archive.clone(), csv_mapping(&[]), MappingFormat::DelimitedText)
        .await
        .unwrap();

    assert!(output.log.is_empty());
    assert_eq!(read_archive(output.archive).await, read_archive(archive).await);
}

#[tokio::test]
async fn missing_name_touches_nothing() {
    let archive = build_archive(&[("a.txt", "alpha"), ("b/c.txt", "gamma")]);
    let mapping = csv_mapping(&[("missing.txt", "found.txt")]);

    let output = process(archive.clone(), mapping, MappingFormat::DelimitedText)
        .await
        .unwrap();

    assert_eq!(output.log, [not_found("missing.txt")]);
    assert_eq!(read_archive(output.archive).await, read_archive(archive).await);
}

#[tokio::test]
async fn log_follows_first_appearance_with_last_value() {
    let archive = build_archive(&[("a.txt", "1"), ("b.txt", "2")]);
    let mapping = csv_mapping(&[
        ("b.txt", "x.txt"),
        ("a.txt", "y.txt"),
        ("b.txt", "z.txt"),
    ]);

    let output = process(archive, mapping, MappingFormat::DelimitedText)
        .await
        .unwrap();

    assert_eq!(
        output.log,
        [renamed("b.txt", "z.txt"), renamed("a.txt", "y.txt")]
    );
    assert_eq!(archive_paths(output.archive).await, ["y.txt", "z.txt"]);
}

#[tokio::test]
async fn legacy_headerless_mapping() {
    let archive = build_archive(&[("a.txt", "1"), ("c.txt", "3")]);
    let mapping = b"a.txt,b.txt\nbroken row\nc.txt,d.txt,extra\n".to_vec();

    let output = process(archive, mapping, MappingFormat::SpreadsheetLegacyHeaderless)
        .await
        .unwrap();

    assert_eq!(output.log, [renamed("a.txt", "b.txt")]);
    assert_eq!(archive_paths(output.archive).await, ["b.txt", "c.txt"]);
}

#[tokio::test]
async fn legacy_headerless_workbook() {
    let archive = build_archive(&[("a.txt", "1"), ("c.txt", "3")]);
    let rows = vec![ziprename::MappingPair::new("a.txt", "b.txt")];
    let mapping = template::xlsx_template(&rows).unwrap();

    let output = process(archive, mapping, MappingFormat::SpreadsheetLegacyHeaderless)
        .await
        .unwrap();

    // The header cells read as a pair whose old name is absent
    assert_eq!(
        output.log,
        [not_found("oldname"), renamed("a.txt", "b.txt")]
    );
    assert_eq!(archive_paths(output.archive).await, ["b.txt", "c.txt"]);
}

#[tokio::test]
async fn spreadsheet_mapping() {
    let archive = build_archive(&[("IMG_0001.jpg", "jpeg")]);
    let rows = vec![ziprename::MappingPair::new("IMG_0001.jpg", "beach.jpg")];
    let mapping = template::xlsx_template(&rows).unwrap();

    let output = process(archive, mapping, MappingFormat::Spreadsheet)
        .await
        .unwrap();

    assert_eq!(output.log, [renamed("IMG_0001.jpg", "beach.jpg")]);
    assert_eq!(archive_paths(output.archive).await, ["beach.jpg"]);
}

#[tokio::test]
async fn explicit_directories_survive() {
    let archive = build_archive(&[("empty/", ""), ("docs/", ""), ("docs/a.txt", "a")]);
    let mapping = csv_mapping(&[("a.txt", "b.txt")]);

    let output = process(archive, mapping, MappingFormat::DelimitedText)
        .await
        .unwrap();

    assert_eq!(
        archive_paths(output.archive).await,
        ["docs/", "docs/b.txt", "empty/"]
    );
}

#[tokio::test]
async fn exclusions_are_left_out() {
    let archive = build_archive(&[("input.zip", "old upload"), ("a.txt", "a")]);
    let options = ProcessOptions::default().exclude("input.zip");

    let output = process_with_options(
        archive,
        csv_mapping(&[]),
        MappingFormat::DelimitedText,
        &options,
    )
    .await
    .unwrap();

    assert_eq!(archive_paths(output.archive).await, ["a.txt"]);
}

#[tokio::test]
async fn stored_output_is_uncompressed() {
    let text = "repetitive ".repeat(100);
    let archive = build_archive(&[("a.txt", text.as_str())]);
    let options = ProcessOptions::default().compression(Compression::Stored);

    let output = process_with_options(
        archive,
        csv_mapping(&[("a.txt", "b.txt")]),
        MappingFormat::DelimitedText,
        &options,
    )
    .await
    .unwrap();

    let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(output.archive)));
    let entries = extractor.list_files().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].file_name, "b.txt");
    assert_eq!(entries[0].compressed_size, entries[0].uncompressed_size);
    assert_eq!(
        extractor.extract_to_memory(&entries[0]).await.unwrap(),
        text.as_bytes()
    );
}

#[tokio::test]
async fn cp437_names_survive_and_match() {
    let mut archive = build_archive(&[("cafX.txt", "first"), ("cafY.txt", "second")]);
    // Placeholders are ASCII, so the UTF-8 flag stays clear
    assert_eq!(patch_bytes(&mut archive, b"cafX.txt", b"caf\x82.txt"), 2);
    assert_eq!(patch_bytes(&mut archive, b"cafY.txt", b"caf\x8a.txt"), 2);

    let output = process(
        archive,
        csv_mapping(&[("café.txt", "coffee.txt")]),
        MappingFormat::DelimitedText,
    )
    .await
    .unwrap();

    assert_eq!(output.log, [renamed("café.txt", "coffee.txt")]);
    let contents = read_archive(output.archive).await;
    assert_eq!(contents.len(), 2);
    assert_eq!(contents["coffee.txt"].as_deref(), Some(&b"first"[..]));
    assert_eq!(contents["cafè.txt"].as_deref(), Some(&b"second"[..]));
}

#[tokio::test]
async fn root_directory_entry_is_ignored() {
    let archive = build_archive(&[("./", ""), ("photo.jpg", "sun")]);
    let mapping = csv_mapping(&[("photo.jpg", "vacation.jpg")]);

    let output = process(archive, mapping, MappingFormat::DelimitedText)
        .await
        .unwrap();

    assert_eq!(output.log, [renamed("photo.jpg", "vacation.jpg")]);
    assert_eq!(archive_paths(output.archive).await, ["vacation.jpg"]);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn corrupt_archive_aborts() {
    let mut archive = build_archive(&[("a.txt", "alpha alpha alpha")]);
    archive.truncate(archive.len() - 5);

    let err = process(archive, csv_mapping(&[]), MappingFormat::DelimitedText)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::CorruptArchive(_)), "{err}");
}

#[tokio::test]
async fn corrupt_archive_is_reported_before_bad_mapping() {
    let err = process(
        b"garbage".to_vec(),
        b"nope,nope\n".to_vec(),
        MappingFormat::DelimitedText,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CoreError::CorruptArchive(_)), "{err}");
}

#[tokio::test]
async fn missing_columns_abort_before_renaming() {
    let archive = build_archive(&[("a.txt", "alpha")]);
    let err = process(archive, b"old,new\na.txt,b.txt\n".to_vec(), MappingFormat::DelimitedText)
        .await
        .unwrap_err();
    assert!(
        matches!(err, CoreError::MissingColumns { ref missing } if missing.len() == 2),
        "{err}"
    );
}

#[tokio::test]
async fn traversal_in_mapping_is_rejected() {
    let archive = build_archive(&[("a.txt", "alpha")]);
    let mapping = csv_mapping(&[("a.txt", "ok.txt"), ("b.txt", "../../etc/passwd")]);

    let err = process(archive, mapping, MappingFormat::DelimitedText)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidName { .. }), "{err}");
    assert!(err.is_input_error());
}

#[tokio::test]
async fn unreadable_workbook_is_unparseable() {
    let archive = build_archive(&[("a.txt", "alpha")]);
    let err = process(archive, b"PK not really".to_vec(), MappingFormat::Spreadsheet)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::UnparseableMapping(_)), "{err}");
}

// =============================================================================
// Working area lifetime
// =============================================================================

async fn assert_released(archive: Vec<u8>, mapping: Vec<u8>, should_succeed: bool) {
    let base = tempfile::tempdir().unwrap();
    let options = ProcessOptions::default().work_dir(base.path());

    let result =
        process_with_options(archive, mapping, MappingFormat::DelimitedText, &options).await;
    assert_eq!(result.is_ok(), should_succeed, "{:?}", result.err());
    assert_eq!(
        std::fs::read_dir(base.path()).unwrap().count(),
        0,
        "working area left behind"
    );
}

#[tokio::test]
async fn working_area_released_on_success() {
    let archive = build_archive(&[("a.txt", "alpha")]);
    assert_released(archive, csv_mapping(&[("a.txt", "b.txt")]), true).await;
}

#[tokio::test]
async fn working_area_released_on_mapping_error() {
    let archive = build_archive(&[("a.txt", "alpha"), ("b/c.txt", "gamma")]);
    assert_released(archive, b"wrong,header\n".to_vec(), false).await;
}

#[tokio::test]
async fn working_area_released_on_invalid_name() {
    let archive = build_archive(&[("a.txt", "alpha")]);
    assert_released(archive, csv_mapping(&[("a.txt", "..")]), false).await;
}

#[tokio::test]
async fn working_area_released_on_corrupt_entry() {
    let mut archive = build_archive(&[("a.txt", "stored?"), ("b.txt", "x")]);
    // Corrupt the first byte of the first entry's data
    archive[30 + "a.txt".len()] ^= 0x55;
    assert_released(archive, csv_mapping(&[]), false).await;
}

#[tokio::test]
async fn concurrent_invocations_are_isolated() {
    let base = tempfile::tempdir().unwrap();
    let options = ProcessOptions::default().work_dir(base.path());

    let jobs = (0..8).map(|i| {
        let options = options.clone();
        tokio::spawn(async move {
            let name = format!("file{i}.txt");
            let archive = build_archive(&[(name.as_str(), name.as_str())]);
            let mapping = csv_mapping(&[(name.as_str(), "renamed.txt")]);
            let output =
                process_with_options(archive, mapping, MappingFormat::DelimitedText, &options)
                    .await
                    .unwrap();
            (name, read_archive(output.archive).await)
        })
    });

    for job in jobs.collect::<Vec<_>>() {
        let (name, contents) = job.await.unwrap();
        assert_eq!(contents["renamed.txt"].as_deref(), Some(name.as_bytes()));
    }
    assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
}
