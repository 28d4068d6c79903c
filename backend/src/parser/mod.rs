//! CSV alternate source with encoding and delimiter auto-detection.
//!
//! A CSV file is already in row form: it bypasses the decoders and becomes a
//! [`Table`] directly. Column types are inferred from the cells (all integers
//! → LONG, all numbers → DOUBLE, otherwise TEXT; a number must print back as
//! the cell text) and header names are made
//! field-legal, keeping the original header as the alias.

use std::collections::HashSet;
use std::path::Path;

use crate::decode::sanitize_field_name;
use crate::models::{FieldDescriptor, FieldType, FieldValue, FlatRow, Table};

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(e: csv::Error) -> Self {
        let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
        CsvError::new(line, e.to_string())
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
    /// Column headers as written in the file
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) if enc != encoding_rs::UTF_8 => enc.decode(bytes).0.into_owned(),
            _ => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

/// Detect the delimiter by counting occurrences in the header line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");
    let mut best_sep = ',';
    let mut best_count = 0;
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }
    best_sep
}

/// Parse CSV text into a typed table.
pub fn parse_table(content: &str, delimiter: char) -> Result<(Table, Vec<String>), CsvError> {
    let delimiter = u8::try_from(delimiter)
        .map_err(|_| CsvError::new(0, format!("Unsupported delimiter '{}'", delimiter)))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(CsvError::new(1, "Empty CSV file"));
    }

    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        cells.push(
            (0..headers.len())
                .map(|i| record.get(i).unwrap_or("").to_string())
                .collect(),
        );
    }

    let types: Vec<FieldType> = (0..headers.len())
        .map(|i| infer_type(cells.iter().map(|row| row[i].as_str())))
        .collect();

    let mut used = HashSet::new();
    let fields = headers
        .iter()
        .zip(&types)
        .map(|(header, field_type)| {
            let base = sanitize_field_name(header);
            let mut name = base.clone();
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            FieldDescriptor {
                name,
                alias: header.clone(),
                field_type: *field_type,
                length: None,
            }
        })
        .collect();

    let mut table = Table::new(fields);
    table.rows = cells
        .into_iter()
        .map(|row| {
            FlatRow::new(
                row.into_iter()
                    .zip(&types)
                    .map(|(cell, ty)| typed_cell(cell, *ty))
                    .collect(),
            )
        })
        .collect();
    table.measure_text_lengths();
    Ok((table, headers))
}

fn infer_type<'a>(column: impl Iterator<Item = &'a str>) -> FieldType {
    let mut seen = false;
    let mut all_int = true;
    let mut all_num = true;
    for cell in column.filter(|c| !c.is_empty()) {
        seen = true;
        all_int &= renders_as::<i64>(cell);
        all_num &= cell.parse::<f64>().is_ok_and(f64::is_finite) && renders_as::<f64>(cell);
    }
    match (seen, all_int, all_num) {
        (false, _, _) => FieldType::Text,
        (true, true, _) => FieldType::Long,
        (true, false, true) => FieldType::Double,
        _ => FieldType::Text,
    }
}

/// A cell is numeric only if the parsed number prints back as the same text,
/// so "0114", "1.10" and 20-digit codes stay text and join keys survive.
fn renders_as<T: std::str::FromStr + ToString>(cell: &str) -> bool {
    cell.parse::<T>().is_ok_and(|v| v.to_string() == cell)
}

fn typed_cell(cell: String, field_type: FieldType) -> FieldValue {
    if cell.is_empty() {
        return FieldValue::Null;
    }
    match field_type {
        FieldType::Long => cell.parse().map(FieldValue::Integer).unwrap_or(FieldValue::Text(cell)),
        FieldType::Double => cell.parse().map(FieldValue::Double).unwrap_or(FieldValue::Text(cell)),
        FieldType::Text => FieldValue::Text(cell),
    }
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<ParseResult, CsvError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let (table, headers) = parse_table(&content, delimiter)?;
    Ok(ParseResult {
        table,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> Result<ParseResult, CsvError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| CsvError::new(0, format!("Cannot read file: {}", e)))?;
    parse_bytes_auto(&bytes)
}
