use std::io::Cursor;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};

use super::{MappingPair, locate_columns};
use crate::error::{CoreError, Result};

/// Leading bytes of the workbook containers calamine reads: ZIP (XLSX,
/// XLSB, ODS) and OLE compound files (XLS)
const WORKBOOK_MAGIC: [&[u8]; 2] = [b"PK\x03\x04", b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1"];

/// Whether `bytes` look like a workbook rather than delimited text
pub(super) fn is_workbook(bytes: &[u8]) -> bool {
    WORKBOOK_MAGIC.iter().any(|magic| bytes.starts_with(magic))
}

fn first_sheet(bytes: &[u8]) -> Result<Range<Data>> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(CoreError::unparseable)?;

    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CoreError::UnparseableMapping("workbook has no worksheets".to_string()))?
        .map_err(CoreError::unparseable)
}

/// First worksheet of a workbook, with an `oldname`/`newname` header row.
///
/// Cells are rendered as text; numeric cells print without a fractional
/// part when they hold whole numbers.
pub(super) fn parse(bytes: &[u8]) -> Result<Vec<MappingPair>> {
    let range = first_sheet(bytes)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    let (old_col, new_col) = locate_columns(headers.iter().map(String::as_str))?;

    let mut pairs = Vec::new();
    for row in rows {
        let old_name = row.get(old_col).map(cell_text).unwrap_or_default();
        let new_name = row.get(new_col).map(cell_text).unwrap_or_default();
        if old_name.is_empty() && new_name.is_empty() {
            continue;
        }
        pairs.push(MappingPair::new(old_name, new_name));
    }

    Ok(pairs)
}

/// First worksheet without a header: a row whose filled cells are exactly
/// the first two is a pair, any other row is dropped.
pub(super) fn parse_headerless(bytes: &[u8]) -> Result<Vec<MappingPair>> {
    let range = first_sheet(bytes)?;

    let mut pairs = Vec::new();
    for (index, row) in range.rows().enumerate() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        let filled = cells.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
        if filled == 2 && !cells[0].is_empty() {
            pairs.push(MappingPair::new(cells[0].clone(), cells[1].clone()));
        } else {
            log::debug!("skipping row {} with {} filled cell(s)", index + 1, filled);
        }
    }

    Ok(pairs)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
