use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use crate::mapping::MappingFormat;

#[derive(Parser, Debug)]
#[command(name = "ziprename")]
#[command(version)]
#[command(about = "Bulk rename files inside a ZIP archive from a CSV or spreadsheet mapping", long_about = None)]
#[command(after_help = "Examples:\n  \
  ziprename rename photos.zip names.csv          write photos-renamed.zip\n  \
  ziprename template -o names.xlsx --from photos.zip   spreadsheet prefilled with file names\n  \
  ziprename list -v photos.zip                   show entries with sizes and dates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Diagnostic logging (-L info, -LL debug); RUST_LOG overrides
    #[arg(long = "log", short = 'L', action = clap::ArgAction::Count, global = true)]
    pub log_level: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rename archive entries according to a mapping table
    Rename {
        /// ZIP archive to read
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Mapping table (.csv, .xlsx, .xls, .ods)
        #[arg(value_name = "MAPPING")]
        mapping: PathBuf,

        /// Output archive (default: <ARCHIVE stem>-renamed.zip)
        #[arg(short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,

        /// Mapping format (default: from the mapping file extension)
        #[arg(short = 'f', long, value_enum)]
        format: Option<FormatArg>,

        /// Store entries without compression
        #[arg(long)]
        stored: bool,

        /// Create the temporary working area inside DIR
        #[arg(short = 'd', long, value_name = "DIR")]
        work_dir: Option<PathBuf>,

        /// Leave entries with these paths out of the output
        #[arg(short = 'x', value_name = "PATH", num_args = 1..)]
        exclude: Vec<String>,

        /// Overwrite the output file if it exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Write a mapping table template
    Template {
        /// Output file; .xlsx writes a spreadsheet, anything else CSV
        #[arg(short = 'o', value_name = "FILE", default_value = "mapping.csv")]
        output: PathBuf,

        /// Prefill rows with the file names found in this archive
        #[arg(long, value_name = "ARCHIVE")]
        from: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(long)]
        overwrite: bool,
    },

    /// List archive entries
    List {
        /// ZIP archive to read
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// List verbosely with sizes, ratio and timestamps
        #[arg(short = 'v')]
        verbose: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    /// CSV with an oldname,newname header
    Csv,
    /// Workbook with an oldname,newname header on the first sheet
    Spreadsheet,
    /// Headerless CSV, rows of exactly two fields
    Legacy,
}

impl From<FormatArg> for MappingFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => MappingFormat::DelimitedText,
            FormatArg::Spreadsheet => MappingFormat::Spreadsheet,
            FormatArg::Legacy => MappingFormat::SpreadsheetLegacyHeaderless,
        }
    }
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default `log` filter for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.log_level {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// `<stem>-renamed.zip` next to the input archive
pub fn default_output(archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    archive.with_file_name(format!("{}-renamed.zip", stem))
}
