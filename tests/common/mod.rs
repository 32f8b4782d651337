//! Shared helpers for integration tests.
//!
//! `#![allow(dead_code)]` because each integration test file compiles as its
//! own crate and uses only some of these helpers.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use ziprename::zip::DosDateTime;
use ziprename::{Compression, MemoryReader, ZipExtractor, ZipWriter};

/// Build an archive from `(path, text)` pairs; paths ending in `/` become
/// directory entries.
pub fn build_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let entries: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, text)| (*name, text.as_bytes()))
        .collect();
    build_archive_bytes(&entries)
}

pub fn build_archive_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Compression::Deflated);
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(name, DosDateTime::EPOCH).unwrap();
        } else {
            writer.add_file(name, data, DosDateTime::EPOCH).unwrap();
        }
    }
    writer.finish().unwrap()
}

/// Read every entry back: path to content, directories map to `None`.
pub async fn read_archive(bytes: Vec<u8>) -> BTreeMap<String, Option<Vec<u8>>> {
    let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
    let mut contents = BTreeMap::new();
    for entry in extractor.list_files().await.unwrap() {
        let data = if entry.is_directory {
            None
        } else {
            Some(extractor.extract_to_memory(&entry).await.unwrap())
        };
        let previous = contents.insert(entry.file_name.clone(), data);
        assert!(previous.is_none(), "duplicate entry {}", entry.file_name);
    }
    contents
}

/// Entry paths of an archive, sorted
pub async fn archive_paths(bytes: Vec<u8>) -> Vec<String> {
    read_archive(bytes).await.into_keys().collect()
}

/// CSV mapping with a header row
pub fn csv_mapping(pairs: &[(&str, &str)]) -> Vec<u8> {
    let mut out = String::from("oldname,newname\n");
    for (old, new) in pairs {
        out.push_str(&format!("{},{}\n", old, new));
    }
    out.into_bytes()
}

/// Overwrite every occurrence of `from` with `to` (same length), e.g. to plant
/// raw non-UTF-8 name bytes in an archive built from ASCII placeholders.
pub fn patch_bytes(archive: &mut [u8], from: &[u8], to: &[u8]) -> usize {
    assert_eq!(from.len(), to.len());
    let mut count = 0;
    let mut i = 0;
    while i + from.len() <= archive.len() {
        if &archive[i..i + from.len()] == from {
            archive[i..i + from.len()].copy_from_slice(to);
            count += 1;
            i += from.len();
        } else {
            i += 1;
        }
    }
    count
}
