//! ZIP archive writer.
//!
//! Builds a complete archive in memory: every entry is compressed up front,
//! so sizes and CRCs are known when the Local File Header is written and no
//! data descriptors are needed.
//!
//! Output is plain (non-ZIP64) ZIP. Limits of that format are checked and
//! reported as errors instead of producing a truncated archive.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::DeflateEncoder;
use std::io::Write;

use anyhow::{Result, bail};

use super::structures::*;

/// Version needed to extract: 1.0 for stored entries and directories
const VERSION_STORED: u16 = 10;
/// Version needed to extract: 2.0 for deflated entries
const VERSION_DEFLATE: u16 = 20;
/// Version made by: MS-DOS host, APPNOTE 2.0
const VERSION_MADE_BY: u16 = 20;

/// Largest entry count a non-ZIP64 End of Central Directory can hold
const MAX_ENTRIES: usize = 0xFFFE;
/// Largest size or offset a non-ZIP64 header can hold
const MAX_U32_FIELD: u64 = 0xFFFF_FFFE;

/// Compression applied to file entries when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Stored,
    #[default]
    Deflated,
}

/// Central directory record kept until [`ZipWriter::finish`]
struct CentralRecord {
    name: String,
    flags: u16,
    method: CompressionMethod,
    version_needed: u16,
    modified: DosDateTime,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    external_attrs: u32,
    lfh_offset: u32,
}

/// In-memory ZIP archive builder
pub struct ZipWriter {
    buf: Vec<u8>,
    central: Vec<CentralRecord>,
    compression: Compression,
}

impl ZipWriter {
    pub fn new(compression: Compression) -> Self {
        Self {
            buf: Vec::new(),
            central: Vec::new(),
            compression,
        }
    }

    /// Number of entries written so far
    pub fn len(&self) -> usize {
        self.central.len()
    }

    pub fn is_empty(&self) -> bool {
        self.central.is_empty()
    }

    /// Add a file entry.
    ///
    /// With [`Compression::Deflated`], data that does not shrink is stored.
    pub fn add_file(&mut self, name: &str, data: &[u8], modified: DosDateTime) -> Result<()> {
        if name.is_empty() || name.ends_with('/') {
            bail!("Invalid file entry name '{}'", name);
        }
        if data.len() as u64 > MAX_U32_FIELD {
            bail!(
                "Entry '{}' is {} bytes, larger than a non-ZIP64 archive allows",
                name,
                data.len()
            );
        }

        let crc32 = crc32fast::hash(data);
        let deflated = match self.compression {
            Compression::Deflated => Some(deflate(data)?),
            Compression::Stored => None,
        };

        match deflated {
            Some(compressed) if compressed.len() < data.len() => self.push_entry(
                name,
                CompressionMethod::Deflate,
                modified,
                crc32,
                &compressed,
                data.len(),
                0,
            ),
            _ => self.push_entry(
                name,
                CompressionMethod::Stored,
                modified,
                crc32,
                data,
                data.len(),
                0,
            ),
        }
    }

    /// Add a directory entry; a trailing `/` is appended when missing.
    pub fn add_directory(&mut self, name: &str, modified: DosDateTime) -> Result<()> {
        let trimmed = name.trim_end_matches('/');
        if trimmed.is_empty() {
            bail!("Invalid directory entry name '{}'", name);
        }
        let name = format!("{}/", trimmed);
        self.push_entry(
            &name,
            CompressionMethod::Stored,
            modified,
            0,
            &[],
            0,
            DOS_DIRECTORY_ATTR,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push_entry(
        &mut self,
        name: &str,
        method: CompressionMethod,
        modified: DosDateTime,
        crc32: u32,
        payload: &[u8],
        uncompressed_size: usize,
        external_attrs: u32,
    ) -> Result<()> {
        if self.central.len() >= MAX_ENTRIES {
            bail!(
                "Too many entries for a non-ZIP64 archive (limit {})",
                MAX_ENTRIES
            );
        }
        if name.len() > u16::MAX as usize {
            bail!("Entry name is too long ({} bytes)", name.len());
        }
        let lfh_offset = self.buf.len() as u64;
        if lfh_offset + (LFH_SIZE + name.len() + payload.len()) as u64 > MAX_U32_FIELD {
            bail!("Archive exceeds 4 GiB, which requires ZIP64");
        }

        let flags = if name.is_ascii() { 0 } else { FLAG_UTF8 };
        let version_needed = match method {
            CompressionMethod::Deflate => VERSION_DEFLATE,
            _ => VERSION_STORED,
        };

        let out = &mut self.buf;
        out.write_all(LFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(version_needed)?;
        out.write_u16::<LittleEndian>(flags)?;
        out.write_u16::<LittleEndian>(method.as_u16())?;
        out.write_u16::<LittleEndian>(modified.time)?;
        out.write_u16::<LittleEndian>(modified.date)?;
        out.write_u32::<LittleEndian>(crc32)?;
        out.write_u32::<LittleEndian>(payload.len() as u32)?;
        out.write_u32::<LittleEndian>(uncompressed_size as u32)?;
        out.write_u16::<LittleEndian>(name.len() as u16)?;
        out.write_u16::<LittleEndian>(0)?; // extra field length
        out.write_all(name.as_bytes())?;
        out.write_all(payload)?;

        self.central.push(CentralRecord {
            name: name.to_string(),
            flags,
            method,
            version_needed,
            modified,
            crc32,
            compressed_size: payload.len() as u32,
            uncompressed_size: uncompressed_size as u32,
            external_attrs,
            lfh_offset: lfh_offset as u32,
        });

        Ok(())
    }

    /// Write the Central Directory and EOCD and return the archive bytes
    pub fn finish(self) -> Result<Vec<u8>> {
        let ZipWriter {
            mut buf, central, ..
        } = self;

        let cd_offset = buf.len() as u64;
        for record in &central {
            buf.write_all(CDFH_SIGNATURE)?;
            buf.write_u16::<LittleEndian>(VERSION_MADE_BY)?;
            buf.write_u16::<LittleEndian>(record.version_needed)?;
            buf.write_u16::<LittleEndian>(record.flags)?;
            buf.write_u16::<LittleEndian>(record.method.as_u16())?;
            buf.write_u16::<LittleEndian>(record.modified.time)?;
            buf.write_u16::<LittleEndian>(record.modified.date)?;
            buf.write_u32::<LittleEndian>(record.crc32)?;
            buf.write_u32::<LittleEndian>(record.compressed_size)?;
            buf.write_u32::<LittleEndian>(record.uncompressed_size)?;
            buf.write_u16::<LittleEndian>(record.name.len() as u16)?;
            buf.write_u16::<LittleEndian>(0)?; // extra field length
            buf.write_u16::<LittleEndian>(0)?; // comment length
            buf.write_u16::<LittleEndian>(0)?; // disk number start
            buf.write_u16::<LittleEndian>(0)?; // internal attributes
            buf.write_u32::<LittleEndian>(record.external_attrs)?;
            buf.write_u32::<LittleEndian>(record.lfh_offset)?;
            buf.write_all(record.name.as_bytes())?;
        }
        let cd_size = buf.len() as u64 - cd_offset;
        if cd_offset + cd_size > MAX_U32_FIELD {
            bail!("Archive exceeds 4 GiB, which requires ZIP64");
        }

        buf.write_all(EndOfCentralDirectory::SIGNATURE)?;
        buf.write_u16::<LittleEndian>(0)?; // this disk
        buf.write_u16::<LittleEndian>(0)?; // disk with central directory
        buf.write_u16::<LittleEndian>(central.len() as u16)?;
        buf.write_u16::<LittleEndian>(central.len() as u16)?;
        buf.write_u32::<LittleEndian>(cd_size as u32)?;
        buf.write_u32::<LittleEndian>(cd_offset as u32)?;
        buf.write_u16::<LittleEndian>(0)?; // comment length

        Ok(buf)
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
