//! # ziprename
//!
//! Bulk rename files inside a ZIP archive from a CSV or spreadsheet mapping.
//!
//! An invocation takes the archive bytes and a mapping table of
//! `oldname`,`newname` pairs, extracts the archive into a private working
//! area, renames matching files in place and packs the result into a new
//! archive. Every mapping key yields one [`RenameOutcome`] in the log.
//!
//! ## Features
//!
//! - Reads ZIP and ZIP64 archives with STORED and DEFLATE entries, verifying CRC-32
//! - Mapping tables as CSV (with or without header) or XLSX/XLS/ODS workbooks
//! - Collisions are skipped, never overwritten
//! - Mapping keys may be bare file names or full paths inside the archive
//! - Names that would escape their directory are rejected
//!
//! ## Example
//!
//! ```no_run
//! use ziprename::{MappingFormat, process};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let archive = std::fs::read("photos.zip")?;
//!     let mapping = b"oldname,newname\nIMG_0001.jpg,beach.jpg\n".to_vec();
//!
//!     let output = process(archive, mapping, MappingFormat::DelimitedText).await?;
//!     for outcome in &output.log {
//!         println!("{}", outcome);
//!     }
//!     std::fs::write("photos-renamed.zip", &output.archive)?;
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod mapping;
pub mod process;
pub mod repack;
pub mod resolve;
pub mod template;
pub mod tree;
pub mod unpack;
pub mod zip;

pub use cli::Cli;
pub use error::{CoreError, Result};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use mapping::{MappingFormat, MappingPair, MappingTable};
pub use process::{ProcessOptions, ProcessOutput, process, process_with_options};
pub use resolve::RenameOutcome;
pub use tree::WorkingTree;
pub use zip::{Compression, ZipExtractor, ZipFileEntry, ZipWriter};
