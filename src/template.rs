//! Mapping table templates.
//!
//! Produces the two-column `oldname`,`newname` table users fill in, either as
//! CSV or as a minimal XLSX workbook. Rows can be prefilled from the files of
//! an existing archive.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;

use crate::io::ReadAt;
use crate::mapping::{MappingPair, NEW_NAME_COLUMN, OLD_NAME_COLUMN};
use crate::tree::EntryPath;
use crate::zip::{Compression, DosDateTime, ZipExtractor, ZipWriter};

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIPS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const DOC_RELATIONSHIP: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Example rows for a blank template
pub fn sample_rows() -> Vec<MappingPair> {
    vec![
        MappingPair::new("photo.jpg", "vacation.jpg"),
        MappingPair::new("report.docx", "report-final.docx"),
    ]
}

/// Rows mapping every name to itself, ready to be edited
pub fn identity_rows(names: &[String]) -> Vec<MappingPair> {
    names
        .iter()
        .map(|name| MappingPair::new(name.as_str(), name.as_str()))
        .collect()
}

/// Distinct file base names of an archive, in archive order
pub async fn archive_file_names<R: ReadAt>(reader: Arc<R>) -> Result<Vec<String>> {
    let entries = ZipExtractor::new(reader).list_files().await?;

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for entry in entries.iter().filter(|e| !e.is_directory) {
        let Ok(path) = EntryPath::from_archive_name(&entry.file_name) else {
            continue;
        };
        let name = path.base_name().to_string();
        if seen.insert(name.clone()) {
            names.push(name);
        }
    }

    Ok(names)
}

/// CSV template with a header row
pub fn csv_template(rows: &[MappingPair]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record([OLD_NAME_COLUMN, NEW_NAME_COLUMN])?;
        for row in rows {
            writer.write_record([&row.old_name, &row.new_name])?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// XLSX template: one worksheet named `mapping` with a header row
pub fn xlsx_template(rows: &[MappingPair]) -> Result<Vec<u8>> {
    let header = MappingPair::new(OLD_NAME_COLUMN, NEW_NAME_COLUMN);
    let all_rows: Vec<&MappingPair> = std::iter::once(&header).chain(rows).collect();

    let mut strings = String::new();
    let mut sheet_rows = String::new();
    for (i, row) in all_rows.iter().enumerate() {
        let r = i + 1;
        write!(
            sheet_rows,
            r#"<row r="{r}"><c r="A{r}" t="s"><v>{}</v></c><c r="B{r}" t="s"><v>{}</v></c></row>"#,
            2 * i,
            2 * i + 1
        )?;
        for text in [&row.old_name, &row.new_name] {
            write!(
                strings,
                r#"<si><t xml:space="preserve">{}</t></si>"#,
                xml_escape(text)
            )?;
        }
    }
    let count = all_rows.len() * 2;

    let content_types = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/xl/workbook.xml" ContentType="{}.sheet.main+xml"/>"#,
            r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="{}.worksheet+xml"/>"#,
            r#"<Override PartName="/xl/sharedStrings.xml" ContentType="{}.sharedStrings+xml"/>"#,
            r#"</Types>"#
        ),
        "application/vnd.openxmlformats-officedocument.spreadsheetml",
        "application/vnd.openxmlformats-officedocument.spreadsheetml",
        "application/vnd.openxmlformats-officedocument.spreadsheetml",
    );
    let package_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{RELATIONSHIPS_NS}"><Relationship Id="rId1" Type="{DOC_RELATIONSHIP}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    );
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{SPREADSHEET_NS}" xmlns:r="{DOC_RELATIONSHIP}"><sheets><sheet name="mapping" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    );
    let workbook_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{RELATIONSHIPS_NS}"><Relationship Id="rId1" Type="{DOC_RELATIONSHIP}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{DOC_RELATIONSHIP}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#
    );
    let shared_strings = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{SPREADSHEET_NS}" count="{count}" uniqueCount="{count}">{strings}</sst>"#
    );
    let sheet = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{SPREADSHEET_NS}"><sheetData>{sheet_rows}</sheetData></worksheet>"#
    );

    let mut writer = ZipWriter::new(Compression::Deflated);
    for (name, part) in [
        ("[Content_Types].xml", &content_types),
        ("_rels/.rels", &package_rels),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", &workbook_rels),
        ("xl/sharedStrings.xml", &shared_strings),
        ("xl/worksheets/sheet1.xml", &sheet),
    ] {
        writer.add_file(name, part.as_bytes(), DosDateTime::EPOCH)?;
    }
    writer.finish()
}

/// Escape text for XML character data. Control characters other than tab,
/// CR and LF are not allowed in XML 1.0 and are dropped.
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' | '\n' | '\r' => out.push(c),
            c if c < '\u{20}' => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
