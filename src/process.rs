//! End-to-end rename invocation.
//!
//! [`process`] runs extraction and mapping parsing concurrently, then
//! resolution and repacking. The working tree is owned by the invocation and
//! released before returning on every path: explicitly on success, by drop
//! on errors, panics, or when the caller abandons the future.

use std::path::PathBuf;

use crate::error::Result;
use crate::mapping::{MappingFormat, MappingTable, parse_mapping};
use crate::repack::repack;
use crate::resolve::{RenameOutcome, resolve};
use crate::unpack::unpack;
use crate::zip::Compression;

/// Knobs for a rename invocation
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Directory in which the temporary working area is created
    pub work_dir: Option<PathBuf>,
    /// Compression for file entries of the output archive
    pub compression: Compression,
    /// Entry paths to leave out of the output archive
    pub exclude: Vec<String>,
}

impl ProcessOptions {
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }
}

/// Result of a successful invocation
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// The renamed archive
    pub archive: Vec<u8>,
    /// One outcome per distinct mapping key, in mapping order
    pub log: Vec<RenameOutcome>,
}

impl ProcessOutput {
    pub fn renamed_count(&self) -> usize {
        self.log.iter().filter(|o| o.is_renamed()).count()
    }
}

/// Rename entries of `archive` according to `mapping` with default options
pub async fn process(
    archive: Vec<u8>,
    mapping: Vec<u8>,
    format: MappingFormat,
) -> Result<ProcessOutput> {
    process_with_options(archive, mapping, format, &ProcessOptions::default()).await
}

pub async fn process_with_options(
    archive: Vec<u8>,
    mapping: Vec<u8>,
    format: MappingFormat,
    options: &ProcessOptions,
) -> Result<ProcessOutput> {
    let (tree, table) = tokio::join!(unpack(archive, options.work_dir.as_deref()), async {
        parse_mapping(&mapping, format).and_then(MappingTable::build)
    });
    // An archive failure is reported first; the tree of a good archive is
    // dropped here when the mapping is bad.
    let mut tree = tree?;
    let table = table?;

    let log = resolve(&mut tree, &table);
    let archive = repack(&tree, &options.exclude, options.compression).await?;
    tree.close()?;

    Ok(ProcessOutput { archive, log })
}
