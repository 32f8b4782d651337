//! ZIP archive codec.
//!
//! Reading walks the archive from its tail: the end of central directory
//! record (and its ZIP64 counterpart when present) locates the central
//! directory, whose headers describe every entry. Local headers are only
//! consulted to find where entry data starts.
//!
//! - [`structures`]: on-disk records and the entry metadata derived from them
//! - [`parser`]: central directory parsing with bounds checks against the source size
//! - [`extractor`]: entry decompression (STORED, DEFLATE) with size and CRC-32 checks
//! - [`writer`]: in-memory archive builder for the renamed tree
//!
//! Encrypted entries, multi-disk archives and other compression methods are
//! rejected. Written archives stay within non-ZIP64 limits.

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
pub use writer::{Compression, ZipWriter};
