//! Rename mapping tables.
//!
//! A mapping arrives as CSV or as a spreadsheet workbook and is parsed into
//! ordered [`MappingPair`]s according to an explicit [`MappingFormat`]. The
//! pairs are then folded into a [`MappingTable`], which keeps one instruction
//! per distinct old name and validates every name before any rename runs.

mod delimited;
mod spreadsheet;

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CoreError, Result};
use crate::tree::EntryPath;

/// Header of the column holding current names
pub const OLD_NAME_COLUMN: &str = "oldname";
/// Header of the column holding replacement names
pub const NEW_NAME_COLUMN: &str = "newname";

/// How mapping bytes are to be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingFormat {
    /// CSV with an `oldname`,`newname` header row
    DelimitedText,
    /// Workbook (xlsx, xlsm, xlsb, xls, ods) whose first sheet has an
    /// `oldname`,`newname` header row
    Spreadsheet,
    /// Headerless table, delimited text or a workbook (told apart by its
    /// leading bytes): every row of exactly two fields is a pair, other rows
    /// are dropped without error
    SpreadsheetLegacyHeaderless,
}

impl MappingFormat {
    /// Infer the format from a file extension, case-insensitively
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(MappingFormat::DelimitedText),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(MappingFormat::Spreadsheet),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// A single rename instruction as read from the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingPair {
    pub old_name: String,
    pub new_name: String,
}

impl MappingPair {
    pub fn new(old_name: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            old_name: old_name.into(),
            new_name: new_name.into(),
        }
    }
}

/// Parse mapping bytes into pairs, in table order
pub fn parse_mapping(bytes: &[u8], format: MappingFormat) -> Result<Vec<MappingPair>> {
    let pairs = match format {
        MappingFormat::DelimitedText => delimited::parse_with_header(bytes)?,
        MappingFormat::SpreadsheetLegacyHeaderless if spreadsheet::is_workbook(bytes) => {
            spreadsheet::parse_headerless(bytes)?
        }
        MappingFormat::SpreadsheetLegacyHeaderless => delimited::parse_headerless(bytes)?,
        MappingFormat::Spreadsheet => spreadsheet::parse(bytes)?,
    };
    log::info!("parsed {} mapping row(s) as {:?}", pairs.len(), format);
    Ok(pairs)
}

/// Locates the entry a mapping key refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Any file with this base name; the first one in walk order wins
    BaseName(String),
    /// The file at exactly this relative path
    Path(EntryPath),
}

/// Validated rename instruction of a [`MappingTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    /// Key exactly as written in the table
    pub old_name: String,
    pub new_name: String,
    pub target: Target,
}

/// Deduplicated rename instructions.
///
/// Each distinct old name keeps the position of its first appearance and the
/// new name of its last appearance.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    rules: Vec<RenameRule>,
}

impl MappingTable {
    /// Fold pairs into a table, rejecting unusable names
    pub fn build(pairs: impl IntoIterator<Item = MappingPair>) -> Result<Self> {
        let mut order: Vec<MappingPair> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for pair in pairs {
            match index.get(&pair.old_name) {
                Some(&i) => {
                    log::debug!(
                        "mapping for '{}' replaced: '{}' -> '{}'",
                        pair.old_name,
                        order[i].new_name,
                        pair.new_name
                    );
                    order[i].new_name = pair.new_name;
                }
                None => {
                    index.insert(pair.old_name.clone(), order.len());
                    order.push(pair);
                }
            }
        }

        let rules = order
            .into_iter()
            .map(|pair| {
                validate_base_name(&pair.new_name)?;
                let target = parse_target(&pair.old_name)?;
                Ok(RenameRule {
                    old_name: pair.old_name,
                    new_name: pair.new_name,
                    target,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[RenameRule] {
        &self.rules
    }
}

fn invalid(name: &str, reason: &'static str) -> CoreError {
    CoreError::InvalidName {
        name: name.to_string(),
        reason,
    }
}

/// Check a single path segment
fn validate_segment(name: &str, segment: &str) -> Result<()> {
    match segment {
        "" => Err(invalid(name, "empty name")),
        "." | ".." => Err(invalid(name, "relative directory reference")),
        s if s.contains('\\') => Err(invalid(name, "contains a backslash")),
        s if s.contains('\0') => Err(invalid(name, "contains a NUL byte")),
        _ => Ok(()),
    }
}

fn validate_base_name(name: &str) -> Result<()> {
    if name.contains('/') {
        return Err(invalid(name, "new name must not contain a path separator"));
    }
    validate_segment(name, name)
}

fn parse_target(name: &str) -> Result<Target> {
    if !name.contains('/') {
        validate_segment(name, name)?;
        return Ok(Target::BaseName(name.to_string()));
    }

    if name.starts_with('/') {
        return Err(invalid(name, "absolute path"));
    }
    let segments = name
        .split('/')
        .map(|segment| validate_segment(name, segment).map(|()| segment.to_string()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Target::Path(EntryPath::from_segments(segments)))
}

/// Drop a leading UTF-8 byte-order mark
fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
}

/// Position of the required columns in a header row
fn locate_columns<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<(usize, usize)> {
    let mut old_col = None;
    let mut new_col = None;
    for (i, header) in headers.into_iter().enumerate() {
        match header {
            OLD_NAME_COLUMN if old_col.is_none() => old_col = Some(i),
            NEW_NAME_COLUMN if new_col.is_none() => new_col = Some(i),
            _ => {}
        }
    }

    match (old_col, new_col) {
        (Some(old), Some(new)) => Ok((old, new)),
        (old, new) => {
            let mut missing = Vec::new();
            if old.is_none() {
                missing.push(OLD_NAME_COLUMN);
            }
            if new.is_none() {
                missing.push(NEW_NAME_COLUMN);
            }
            Err(CoreError::MissingColumns { missing })
        }
    }
}
