use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Extract and verify file data into memory.
    ///
    /// STORED and DEFLATE entries are supported. The decompressed length
    /// and CRC-32 must match the Central Directory record.
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        if entry.is_encrypted() {
            bail!("Entry '{}' is encrypted", entry.file_name);
        }

        let data_offset = self.parser.get_data_offset(entry).await?;

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => inflate(&raw, entry.uncompressed_size)
                .with_context(|| format!("Invalid DEFLATE stream in '{}'", entry.file_name))?,
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} in '{}' (only STORED and DEFLATE are supported)",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "Size mismatch in '{}': expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let crc = crc32fast::hash(&data);
        if crc != entry.crc32 {
            bail!(
                "CRC-32 mismatch in '{}': expected {:08x}, got {:08x}",
                entry.file_name,
                entry.crc32,
                crc
            );
        }

        Ok(data)
    }

    /// Extract file to disk
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        let data = self.extract_to_memory(entry).await?;
        write_file(output_path, &data).await
    }
}

/// Write bytes to `path`, creating parent directories as needed.
async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await?;

    Ok(())
}

/// Inflate a raw DEFLATE stream, reading at most one byte past the
/// declared size so oversized output is caught without unbounded growth.
fn inflate(raw: &[u8], expected_size: u64) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_size.min(64 * 1024 * 1024) as usize);
    DeflateDecoder::new(raw)
        .take(expected_size.saturating_add(1))
        .read_to_end(&mut out)?;
    Ok(out)
}
