use csv::{ReaderBuilder, StringRecord};

use super::{MappingPair, locate_columns, strip_bom};
use crate::error::{CoreError, Result};

fn reader(bytes: &[u8], has_headers: bool) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_reader(strip_bom(bytes))
}

/// CSV with a header row naming the `oldname` and `newname` columns.
pub(super) fn parse_with_header(bytes: &[u8]) -> Result<Vec<MappingPair>> {
    let mut reader = reader(bytes, true);
    let headers = reader.headers().map_err(CoreError::unparseable)?.clone();
    let (old_col, new_col) = locate_columns(headers.iter())?;

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(CoreError::unparseable)?;
        let old_name = field(&record, old_col);
        let new_name = field(&record, new_col);
        if old_name.is_empty() && new_name.is_empty() {
            continue;
        }
        pairs.push(MappingPair::new(old_name, new_name));
    }

    Ok(pairs)
}

/// Headerless CSV: rows of exactly two fields, anything else is skipped.
pub(super) fn parse_headerless(bytes: &[u8]) -> Result<Vec<MappingPair>> {
    let mut pairs = Vec::new();
    for record in reader(bytes, false).records() {
        let record = record.map_err(CoreError::unparseable)?;
        if record.len() == 2 {
            pairs.push(MappingPair::new(&record[0], &record[1]));
        } else {
            log::debug!(
                "skipping row with {} field(s) at line {}",
                record.len(),
                record.position().map_or(0, |p| p.line())
            );
        }
    }
    Ok(pairs)
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_columns_in_any_order() {
        let csv = "note,newname,oldname\nfirst,b.txt,a.txt\nsecond,d.txt,c.txt\n";
        let pairs = parse_with_header(csv.as_bytes()).unwrap();
        assert_eq!(
            pairs,
            [MappingPair::new("a.txt", "b.txt"), MappingPair::new("c.txt", "d.txt")]
        );
    }

    #[test]
    fn header_only_table_is_empty() {
        assert!(parse_with_header(b"oldname,newname\n").unwrap().is_empty());
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let err = parse_with_header(b"OldName,NewName\na,b\n").unwrap_err();
        assert!(matches!(err, CoreError::MissingColumns { ref missing } if missing.len() == 2));
    }

    #[test]
    fn empty_input_has_no_columns() {
        let err = parse_with_header(b"").unwrap_err();
        assert!(matches!(err, CoreError::MissingColumns { .. }));
    }

    #[test]
    fn short_rows_yield_empty_values_and_blank_rows_are_skipped() {
        let csv = "oldname,newname\na.txt\n,\nc.txt,d.txt\n";
        let pairs = parse_with_header(csv.as_bytes()).unwrap();
        assert_eq!(
            pairs,
            [MappingPair::new("a.txt", ""), MappingPair::new("c.txt", "d.txt")]
        );
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let csv = "\u{FEFF}oldname,newname\nx,y\n";
        assert_eq!(
            parse_with_header(csv.as_bytes()).unwrap(),
            [MappingPair::new("x", "y")]
        );
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let csv = "oldname,newname\n\"a,b.txt\",\"c \"\"d\"\".txt\"\n";
        assert_eq!(
            parse_with_header(csv.as_bytes()).unwrap(),
            [MappingPair::new("a,b.txt", "c \"d\".txt")]
        );
    }

    #[test]
    fn headerless_keeps_two_field_rows_only() {
        let csv = "a.txt,b.txt\nlonely\nx,y,z\nc.txt,d.txt\n";
        assert_eq!(
            parse_headerless(csv.as_bytes()).unwrap(),
            [MappingPair::new("a.txt", "b.txt"), MappingPair::new("c.txt", "d.txt")]
        );
    }

    #[test]
    fn headerless_treats_header_row_as_data() {
        let pairs = parse_headerless(b"oldname,newname\na,b\n").unwrap();
        assert_eq!(pairs[0], MappingPair::new("oldname", "newname"));
    }

    #[test]
    fn invalid_utf8_is_unparseable() {
        let err = parse_headerless(b"a.txt,\xFF\xFE.txt\n").unwrap_err();
        assert!(matches!(err, CoreError::UnparseableMapping(_)));

        let err = parse_with_header(b"oldname,newname\n\xC3\x28,b\n").unwrap_err();
        assert!(matches!(err, CoreError::UnparseableMapping(_)));
    }
}
