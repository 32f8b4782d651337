//! Main entry point for the ziprename CLI application.
//!
//! Reads the archive and mapping files, hands their bytes to the library and
//! writes the renamed archive, printing one line per mapping outcome.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use ziprename::cli::{Command, default_output};
use ziprename::template;
use ziprename::{
    Cli, Compression, LocalFileReader, MappingFormat, ProcessOptions, RenameOutcome,
    ZipExtractor, process_with_options,
};

/// Application entry point.
///
/// Parses command-line arguments, installs the logger and dispatches to the
/// subcommand handler.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();

    match &cli.command {
        Command::Rename {
            archive,
            mapping,
            output,
            format,
            stored,
            work_dir,
            exclude,
            overwrite,
        } => {
            let format = match format {
                Some(format) => MappingFormat::from(*format),
                None => MappingFormat::from_path(mapping).with_context(|| {
                    format!(
                        "Cannot tell the format of {} from its extension, use --format",
                        mapping.display()
                    )
                })?,
            };

            let options = ProcessOptions {
                work_dir: work_dir.clone(),
                compression: if *stored {
                    Compression::Stored
                } else {
                    Compression::Deflated
                },
                exclude: exclude.clone(),
            };

            let output = output.clone().unwrap_or_else(|| default_output(archive));
            rename(&cli, archive, mapping, &output, format, &options, *overwrite).await
        }
        Command::Template {
            output,
            from,
            overwrite,
        } => write_template(&cli, output, from.as_deref(), *overwrite).await,
        Command::List { archive, verbose } => list_files(archive, *verbose).await,
    }
}

/// Run a rename invocation and write its output archive.
///
/// The output file is only created once the whole invocation succeeded, so
/// a failed run never leaves a partial archive behind.
async fn rename(
    cli: &Cli,
    archive: &Path,
    mapping: &Path,
    output: &Path,
    format: MappingFormat,
    options: &ProcessOptions,
    overwrite: bool,
) -> Result<()> {
    refuse_existing(output, overwrite)?;

    let (archive_bytes, mapping_bytes) = tokio::try_join!(
        read_input(archive, "archive"),
        read_input(mapping, "mapping table")
    )?;

    let result = process_with_options(archive_bytes, mapping_bytes, format, options)
        .await
        .with_context(|| format!("Cannot rename entries of {}", archive.display()))?;

    if !cli.is_quiet() {
        for outcome in &result.log {
            print_outcome(outcome);
        }
    }

    tokio::fs::write(output, &result.archive)
        .await
        .with_context(|| format!("Cannot write {}", output.display()))?;

    if !cli.is_very_quiet() {
        let renamed = result.renamed_count();
        println!(
            "{} of {} mapping(s) applied, wrote {} ({})",
            renamed,
            result.log.len(),
            output.display(),
            format_size(result.archive.len() as u64)
        );
    }

    Ok(())
}

fn print_outcome(outcome: &RenameOutcome) {
    match outcome {
        RenameOutcome::Renamed { .. } => println!("  {}", outcome),
        _ => eprintln!("  {}", outcome),
    }
}

/// Write a template table, CSV unless the output ends in `.xlsx`.
async fn write_template(
    cli: &Cli,
    output: &Path,
    from: Option<&Path>,
    overwrite: bool,
) -> Result<()> {
    refuse_existing(output, overwrite)?;

    let rows = match from {
        Some(archive) => {
            let reader = Arc::new(LocalFileReader::new(archive)?);
            let names = template::archive_file_names(reader)
                .await
                .with_context(|| format!("Cannot list {}", archive.display()))?;
            template::identity_rows(&names)
        }
        None => template::sample_rows(),
    };

    let is_xlsx = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
    let bytes = if is_xlsx {
        template::xlsx_template(&rows)?
    } else {
        template::csv_template(&rows)?
    };

    tokio::fs::write(output, bytes)
        .await
        .with_context(|| format!("Cannot write {}", output.display()))?;

    if !cli.is_quiet() {
        println!("  wrote template: {} ({} rows)", output.display(), rows.len());
    }

    Ok(())
}

/// List files in the ZIP archive.
///
/// Supports two output formats:
/// - Simple format: Just entry names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
async fn list_files(archive: &Path, verbose: bool) -> Result<()> {
    let reader = Arc::new(LocalFileReader::new(archive)?);
    let extractor = ZipExtractor::new(reader);
    let entries = extractor
        .list_files()
        .await
        .with_context(|| format!("Cannot list {}", archive.display()))?;

    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        if !verbose {
            println!("{}", entry.file_name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }

    Ok(())
}

async fn read_input(path: &Path, what: &str) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read {} {}", what, path.display()))
}

fn refuse_existing(output: &Path, overwrite: bool) -> Result<()> {
    if output.exists() && !overwrite {
        bail!(
            "{} already exists (use --overwrite to replace it)",
            output.display()
        );
    }
    Ok(())
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        let kept = u128::from(compressed) * 100 / u128::from(uncompressed);
        format!("{:>4}%", 100 - kept)
    } else {
        format!("{:>4}%", 0)
    }
}

/// Format a byte size into a human-readable string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(format_size(500), "500 bytes");
/// assert_eq!(format_size(1536), "1.50 KB");
/// assert_eq!(format_size(1048576), "1.00 MB");
/// ```
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
