// Turns an uploaded closeout workbook (XLSX/XLS/CSV) into a plain string
// grid. Format detection goes by extension first, then magic bytes. The
// parser knows nothing about the closeout layout; grouping rows into
// projects happens in the import service.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};

use crate::middleware::error_handling::{AppError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum SheetFormat {
    Csv,
    Excel,
}

impl std::fmt::Display for SheetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetFormat::Csv => write!(f, "csv"),
            SheetFormat::Excel => write!(f, "xlsx"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub format: SheetFormat,
    pub file_hash: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub empty_rows_skipped: usize,
    pub warnings: Vec<String>,
}

pub struct SpreadsheetParser;

impl SpreadsheetParser {
    pub fn parse(data: &[u8], filename: &str) -> Result<ParsedSheet> {
        let file_hash = hash(data);
        let format = detect_format(data, filename)?;

        tracing::info!(
            "Parsing workbook {} ({} bytes, format: {})",
            filename,
            data.len(),
            format
        );

        let mut parsed = match format {
            SheetFormat::Csv => parse_csv(data)?,
            SheetFormat::Excel => parse_excel(data, filename)?,
        };
        parsed.file_hash = file_hash;

        if parsed.rows.is_empty() {
            return Err(AppError::InvalidInput(
                "Workbook contains no data rows".to_string(),
            ));
        }

        Ok(parsed)
    }
}

fn detect_format(data: &[u8], filename: &str) -> Result<SheetFormat> {
    let lower = filename.to_lowercase();

    if lower.ends_with(".csv") || lower.ends_with(".txt") {
        return Ok(SheetFormat::Csv);
    }
    if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        return Ok(SheetFormat::Excel);
    }

    // XLSX is a ZIP (PK..); legacy XLS is an OLE compound file.
    if data.starts_with(b"PK") {
        return Ok(SheetFormat::Excel);
    }
    if data.starts_with(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1") {
        return Ok(SheetFormat::Excel);
    }

    if std::str::from_utf8(data).is_ok() {
        return Ok(SheetFormat::Csv);
    }

    Err(AppError::InvalidInput(
        "Unsupported file format; upload CSV or Excel (XLSX/XLS)".to_string(),
    ))
}

fn parse_csv(data: &[u8]) -> Result<ParsedSheet> {
    let text = std::str::from_utf8(data)
        .map_err(|e| AppError::InvalidInput(format!("Invalid UTF-8 encoding: {}", e)))?;

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::InvalidInput(format!("Failed to read CSV headers: {}", e)))?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::InvalidInput(
            "First row must contain column headers".to_string(),
        ));
    }

    let mut rows = Vec::new();
    let mut empty_rows_skipped = 0;
    let mut warnings = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) => {
                let mut row: Vec<String> =
                    record.iter().map(|s| s.trim().to_string()).collect();

                if row.iter().all(|s| s.is_empty()) {
                    empty_rows_skipped += 1;
                    continue;
                }
                // Ragged rows happen when trailing cells are blank; pad so
                // column indices stay valid.
                row.resize(row.len().max(headers.len()), String::new());
                rows.push(row);
            }
            // idx is 0-based and the header occupies row 1
            Err(e) => warnings.push(format!("Row {} parsing error: {}", idx + 2, e)),
        }
    }

    Ok(ParsedSheet {
        format: SheetFormat::Csv,
        file_hash: String::new(),
        headers,
        rows,
        empty_rows_skipped,
        warnings,
    })
}

fn parse_excel(data: &[u8], filename: &str) -> Result<ParsedSheet> {
    let range = if filename.to_lowercase().ends_with(".xls") {
        let mut workbook = open_workbook_from_rs::<Xls<_>, _>(Cursor::new(data))
            .map_err(|e| AppError::InvalidInput(format!("Failed to open Excel file: {}", e)))?;
        first_sheet_range_xls(&mut workbook)?
    } else {
        let mut workbook = open_workbook_from_rs::<Xlsx<_>, _>(Cursor::new(data))
            .map_err(|e| AppError::InvalidInput(format!("Failed to open Excel file: {}", e)))?;
        first_sheet_range_xlsx(&mut workbook)?
    };

    let mut rows_iter = range.rows();

    let headers: Vec<String> = rows_iter
        .next()
        .ok_or_else(|| AppError::InvalidInput("Excel sheet is empty".to_string()))?
        .iter()
        .map(cell_to_string)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::InvalidInput(
            "First row must contain column headers".to_string(),
        ));
    }

    let mut rows = Vec::new();
    let mut empty_rows_skipped = 0;

    for row in rows_iter {
        let mut row_data: Vec<String> = row.iter().map(cell_to_string).collect();
        if row_data.iter().all(|s| s.is_empty()) {
            empty_rows_skipped += 1;
            continue;
        }
        row_data.resize(row_data.len().max(headers.len()), String::new());
        rows.push(row_data);
    }

    Ok(ParsedSheet {
        format: SheetFormat::Excel,
        file_hash: String::new(),
        headers,
        rows,
        empty_rows_skipped,
        warnings: Vec::new(),
    })
}

fn first_sheet_range_xlsx(workbook: &mut Xlsx<Cursor<&[u8]>>) -> Result<calamine::Range<Data>> {
    let sheet_names = workbook.sheet_names().to_owned();
    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| AppError::InvalidInput("Excel file contains no sheets".to_string()))?;
    workbook
        .worksheet_range(sheet_name)
        .map_err(|e| AppError::InvalidInput(format!("Failed to parse sheet {}: {}", sheet_name, e)))
}

fn first_sheet_range_xls(workbook: &mut Xls<Cursor<&[u8]>>) -> Result<calamine::Range<Data>> {
    let sheet_names = workbook.sheet_names().to_owned();
    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| AppError::InvalidInput("Excel file contains no sheets".to_string()))?;
    workbook
        .worksheet_range(sheet_name)
        .map_err(|e| AppError::InvalidInput(format!("Failed to parse sheet {}: {}", sheet_name, e)))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            let s = format!("{}", f);
            if s.contains('.') {
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            } else {
                s
            }
        }
        Data::String(s) => s.trim().to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("ERROR: {:?}", e),
        Data::Empty => String::new(),
    }
}

fn hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_grid_round_trips() {
        let data = b"Project,Year,Month,Type,WO #,Budget Revenue,Actual Revenue,Budget Cost,Actual Cost\n\
            Riverton WTP,2024,3,Upgrade,,100000,98000,60000,61500\n\
            ,,,,6721,,,,12000\n";
        let sheet = SpreadsheetParser::parse(data, "closeout.csv").unwrap();

        assert_eq!(sheet.format, SheetFormat::Csv);
        assert_eq!(sheet.headers.len(), 9);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][0], "Riverton WTP");
        assert_eq!(sheet.rows[1][4], "6721");
        assert_eq!(sheet.file_hash.len(), 64);
    }

    #[test]
    fn blank_rows_are_skipped_not_errored() {
        let data = b"Project,Year\nAlpha,2024\n,,\nBeta,2024\n";
        let sheet = SpreadsheetParser::parse(data, "projects.csv").unwrap();
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.empty_rows_skipped, 1);
    }

    #[test]
    fn unknown_binary_payload_is_rejected() {
        let data = [0xFFu8, 0xFE, 0x00, 0x01];
        assert!(SpreadsheetParser::parse(&data, "upload.bin").is_err());
    }

    #[test]
    fn zip_magic_routes_to_excel() {
        // Not a real workbook, so opening fails — but as an Excel error,
        // not an unsupported-format one.
        let err = SpreadsheetParser::parse(b"PK\x03\x04junk", "upload.dat").unwrap_err();
        assert!(err.to_string().contains("Excel"));
    }
}
