//! Raw table reading: bytes in, rows of trimmed-later cell strings out.

use std::io::Cursor;
use std::sync::LazyLock;

use calamine::{Data, Reader, Xls, Xlsx};
use partsbin_core::FileType;
use scraper::{Html, Selector};

use crate::error::ImportError;

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid cell selector"));

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads every row of the first sheet (or of the CSV) as strings.
///
/// CSV rows may have differing lengths. Some portals serve an HTML table
/// with an `.xls` extension; when a spreadsheet fails to parse and the
/// content looks like markup, the table rows are read instead.
///
/// # Errors
///
/// Returns [`ImportError::Empty`] for empty input, otherwise the parser's error.
pub fn read_table(content: &[u8], file_type: FileType) -> Result<Vec<Vec<String>>, ImportError> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Err(ImportError::Empty);
    }
    match file_type {
        FileType::Csv => read_csv(content),
        FileType::Xls | FileType::Xlsx => match read_spreadsheet(content, file_type) {
            Ok(rows) => Ok(rows),
            Err(e) if looks_like_html(content) => {
                tracing::debug!(error = %e, "spreadsheet parse failed, reading as HTML table");
                Ok(read_html_table(content))
            }
            Err(e) => Err(e),
        },
    }
}

fn read_csv(content: &[u8]) -> Result<Vec<Vec<String>>, ImportError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
    // Exports from spreadsheet tools are frequently Windows-1252; keep what decodes.
    let text = String::from_utf8_lossy(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(rows)
}

fn read_spreadsheet(content: &[u8], file_type: FileType) -> Result<Vec<Vec<String>>, ImportError> {
    let cursor = Cursor::new(content);
    let range = if file_type == FileType::Xls {
        let mut workbook = Xls::new(cursor).map_err(|e| ImportError::Spreadsheet(e.to_string()))?;
        workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::Spreadsheet("workbook has no sheets".to_owned()))?
            .map_err(|e| ImportError::Spreadsheet(e.to_string()))?
    } else {
        let mut workbook = Xlsx::new(cursor).map_err(|e| ImportError::Spreadsheet(e.to_string()))?;
        workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::Spreadsheet("workbook has no sheets".to_owned()))?
            .map_err(|e| ImportError::Spreadsheet(e.to_string()))?
    };

    Ok(range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect())
}

#[allow(clippy::cast_possible_truncation)]
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        // Whole-number floats are quantities or IDs; print them without ".0".
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn looks_like_html(content: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&content[..content.len().min(512)]).to_ascii_lowercase();
    let head = head.trim_start();
    head.starts_with('<') && (head.contains("<table") || head.contains("<html") || head.contains("<!doctype"))
}

fn read_html_table(content: &[u8]) -> Vec<Vec<String>> {
    let document = Html::parse_document(&String::from_utf8_lossy(content));
    document
        .select(&ROW_SELECTOR)
        .map(|row| {
            row.select(&CELL_SELECTOR)
                .map(|cell| partsbin_scraper::clean_text(&cell.text().collect::<String>()))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_with_bom_and_ragged_rows() {
        let content = b"\xEF\xBB\xBFPart,Qty\nA1,2,extra\nB2\n";
        let rows = read_table(content, FileType::Csv).unwrap();
        assert_eq!(rows[0], vec!["Part", "Qty"]);
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[2], vec!["B2"]);
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let rows = read_table(b"Description,Qty\n\"RES 10K, 1%\",5\n", FileType::Csv).unwrap();
        assert_eq!(rows[1][0], "RES 10K, 1%");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(read_table(b"", FileType::Csv), Err(ImportError::Empty)));
        assert!(matches!(read_table(b"  \n ", FileType::Xlsx), Err(ImportError::Empty)));
    }

    #[test]
    fn garbage_spreadsheet_is_an_error() {
        let err = read_table(b"definitely not a workbook", FileType::Xlsx).unwrap_err();
        assert!(matches!(err, ImportError::Spreadsheet(_)));
    }

    #[test]
    fn html_disguised_as_xls_is_read_as_table() {
        let content = b"<html><body><table>\
            <tr><th>Mouser #</th><th>Order Qty.</th></tr>\
            <tr><td> 595-NE555P </td><td>10</td></tr>\
            </table></body></html>";
        let rows = read_table(content, FileType::Xls).unwrap();
        assert_eq!(rows, vec![vec!["Mouser #", "Order Qty."], vec!["595-NE555P", "10"]]);
    }
}
