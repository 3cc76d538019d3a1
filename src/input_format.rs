// src/input_format.rs - Format, encoding and delimiter detection for raw inputs

use crate::dataset::{Cell, Dataset};
use crate::error::{AuditError, LoadAttempt, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use encoding_rs::{UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Extensions read with the spreadsheet reader instead of as delimited text
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "xlsb", "ods"];

/// Delimiters tried, in priority order
pub const DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

/// Text encodings tried for delimited input, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, with or without a byte-order mark
    Utf8,
    /// UTF-16, endianness taken from the byte-order mark (little-endian without one)
    Utf16,
    /// Windows-1252 legacy Western encoding
    Windows1252,
}

impl TextEncoding {
    pub const PRIORITY: [TextEncoding; 3] = [
        TextEncoding::Utf8,
        TextEncoding::Utf16,
        TextEncoding::Windows1252,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16 => "UTF-16",
            TextEncoding::Windows1252 => "windows-1252",
        }
    }

    /// Strict decode: malformed input is an error, never replaced
    pub fn decode(&self, bytes: &[u8]) -> std::result::Result<String, String> {
        let (encoding, body) = match self {
            TextEncoding::Utf8 => (UTF_8, bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)),
            TextEncoding::Utf16 => match bytes {
                [0xFF, 0xFE, rest @ ..] => (UTF_16LE, rest),
                [0xFE, 0xFF, rest @ ..] => (UTF_16BE, rest),
                _ => (UTF_16LE, bytes),
            },
            TextEncoding::Windows1252 => (WINDOWS_1252, bytes),
        };

        encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .map(|text| text.into_owned())
            .ok_or_else(|| format!("malformed {} input", self.label()))
    }
}

/// Raw tabular input: the caller's original filename plus its bytes
#[derive(Debug, Clone)]
pub struct InputSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputSource {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        InputSource {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(InputSource::new(path.display().to_string(), bytes))
    }

    /// Lowercased extension of the original filename
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    pub fn is_spreadsheet(&self) -> bool {
        SPREADSHEET_EXTENSIONS.contains(&self.extension().as_str())
    }
}

/// Load a file from disk into a dataset
pub fn load_path(path: &Path) -> Result<Dataset> {
    let source = InputSource::from_path(path)?;
    load_source(&source)
}

/// Load an in-memory input into a dataset.
///
/// Spreadsheets are read directly. Everything else is tried as delimited
/// text for every (delimiter, encoding) pair in priority order; the first
/// parse that yields more than one column wins. A single column means the
/// delimiter guess was wrong even when decoding succeeded.
pub fn load_source(source: &InputSource) -> Result<Dataset> {
    let mut attempts = Vec::new();

    if source.is_spreadsheet() {
        match load_spreadsheet(source) {
            Ok(dataset) if dataset.column_count() > 1 => return Ok(dataset),
            Ok(dataset) => attempts.push(LoadAttempt {
                format: "spreadsheet",
                delimiter: None,
                encoding: None,
                reason: format!("only {} column(s)", dataset.column_count()),
            }),
            Err(reason) => attempts.push(LoadAttempt {
                format: "spreadsheet",
                delimiter: None,
                encoding: None,
                reason,
            }),
        }
        return Err(AuditError::UnreadableFormat {
            source_name: source.name.clone(),
            attempts,
        });
    }

    for delimiter in DELIMITERS {
        for encoding in TextEncoding::PRIORITY {
            let outcome = encoding
                .decode(&source.bytes)
                .and_then(|text| parse_delimited(&text, delimiter));

            let reason = match outcome {
                Ok(dataset) if dataset.column_count() > 1 => {
                    debug!(
                        source = %source.name,
                        delimiter = %(delimiter as char).escape_debug(),
                        encoding = encoding.label(),
                        columns = dataset.column_count(),
                        records = dataset.len(),
                        "parsed delimited input"
                    );
                    return Ok(dataset);
                }
                Ok(dataset) => format!("only {} column(s)", dataset.column_count()),
                Err(reason) => reason,
            };

            debug!(
                source = %source.name,
                delimiter = %(delimiter as char).escape_debug(),
                encoding = encoding.label(),
                %reason,
                "delimited parse attempt rejected"
            );
            attempts.push(LoadAttempt {
                format: "delimited",
                delimiter: Some(delimiter as char),
                encoding: Some(encoding.label()),
                reason,
            });
        }
    }

    Err(AuditError::UnreadableFormat {
        source_name: source.name.clone(),
        attempts,
    })
}

/// Parse already-decoded delimited text. The first record is the header.
/// Empty cells are missing, short rows are padded, long rows are an error.
pub fn parse_delimited(text: &str, delimiter: u8) -> std::result::Result<Dataset, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(format!("invalid header row: {}", e)),
        None => return Err("no header row".to_string()),
    };
    let columns = normalize_headers(header.iter());
    let width = columns.len();

    let mut rows = Vec::new();
    for (index, record) in records.enumerate() {
        let record = record.map_err(|e| format!("row {}: {}", index + 2, e))?;
        if record.len() > width {
            return Err(format!(
                "row {} has {} fields but the header has {}",
                index + 2,
                record.len(),
                width
            ));
        }
        rows.push(record.iter().map(Cell::from_raw).collect());
    }

    Ok(Dataset::new(columns, rows))
}

fn load_spreadsheet(source: &InputSource) -> std::result::Result<Dataset, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(source.bytes.clone()))
        .map_err(|e| format!("unreadable workbook: {}", e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|e| format!("unreadable worksheet: {}", e))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| "worksheet is empty".to_string())?;
    let columns = normalize_headers(header.iter().map(|c| spreadsheet_cell(c).render()));

    let rows = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn spreadsheet_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::String(s) => Cell::from_raw(s),
        Data::Int(i) => Cell::Text(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Cell::Text(format!("{}", *f as i64)),
        Data::Float(f) => Cell::Text(f.to_string()),
        Data::Bool(b) => Cell::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(Cell::DateTime).unwrap_or(Cell::Missing),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::from_raw(s)),
        Data::DurationIso(s) => Cell::from_raw(s),
    }
}

/// Blank header names become `Unnamed: <index>`; repeats are suffixed by `Dataset::new`
fn normalize_headers<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .enumerate()
        .map(|(index, name)| match name.as_ref() {
            "" => format!("Unnamed: {}", index),
            other => other.to_string(),
        })
        .collect()
}
