//! Parsing of student bulk-import CSV files.
//!
//! Parsing is separate from persistence: this module turns raw bytes into
//! per-row results, the student service decides what to insert.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CsvImportError {
    #[error("CSV file is empty")]
    Empty,
    #[error("Missing required columns: {0}")]
    MissingColumns(String),
    #[error("CSV has more than {max} data rows")]
    TooManyRows { max: usize },
    #[error("Malformed CSV: {0}")]
    Malformed(String),
}

/// A failed row, `row` being the line number in the file (header = line 1)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowError {
    pub row: u64,
    pub message: String,
}

impl RowError {
    pub fn new(row: u64, message: impl Into<String>) -> Self {
        RowError { row, message: message.into() }
    }
}

/// A syntactically valid student row
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub line: u64,
    pub first_name: String,
    pub last_name: String,
    pub admission_number: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub guardian_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub custom_fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Column {
    FirstName,
    LastName,
    AdmissionNumber,
    DateOfBirth,
    Gender,
    GuardianName,
    Phone,
    Address,
    Custom(String),
}

impl Column {
    fn from_header(raw: &str) -> Column {
        let header = raw.trim().trim_start_matches('\u{feff}').trim();
        let key: String = header
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "firstname" | "first" | "givenname" => Column::FirstName,
            "lastname" | "last" | "surname" | "familyname" => Column::LastName,
            "admissionnumber" | "admissionno" | "admission" | "rollnumber" | "rollno" => Column::AdmissionNumber,
            "dateofbirth" | "dob" | "birthdate" => Column::DateOfBirth,
            "gender" | "sex" => Column::Gender,
            "guardianname" | "guardian" | "parentname" => Column::GuardianName,
            "phone" | "phonenumber" | "contact" => Column::Phone,
            "address" => Column::Address,
            _ => Column::Custom(header.to_string()),
        }
    }

    fn label(&self) -> &str {
        match self {
            Column::FirstName => "firstName",
            Column::LastName => "lastName",
            Column::AdmissionNumber => "admissionNumber",
            Column::DateOfBirth => "dateOfBirth",
            Column::Gender => "gender",
            Column::GuardianName => "guardianName",
            Column::Phone => "phone",
            Column::Address => "address",
            Column::Custom(name) => name,
        }
    }
}

const REQUIRED: [Column; 3] = [Column::FirstName, Column::LastName, Column::AdmissionNumber];

/// Normalizes `YYYY-MM-DD` dates; `None` when the value is not a valid date
pub fn parse_date(raw: &str) -> Option<String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Parses a student CSV into per-row results.
///
/// Header-level problems fail the whole file; row-level problems are
/// reported per row so the caller can import the remaining rows.
pub fn parse_student_csv(data: &[u8], max_rows: usize) -> Result<Vec<Result<StudentRow, RowError>>, CsvImportError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| CsvImportError::Malformed(e.to_string()))?
        .clone();
    if headers.iter().all(|h| h.trim().trim_start_matches('\u{feff}').is_empty()) {
        return Err(CsvImportError::Empty);
    }

    let columns: Vec<Column> = headers.iter().map(Column::from_header).collect();
    let missing: Vec<&str> = REQUIRED
        .iter()
        .filter(|required| !columns.contains(required))
        .map(Column::label)
        .collect();
    if !missing.is_empty() {
        return Err(CsvImportError::MissingColumns(missing.join(", ")));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // header is line 1, first data row line 2
        let fallback_line = index as u64 + 2;
        let parsed = match record {
            Ok(record) => {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                let line = record.position().map(|p| p.line()).unwrap_or(fallback_line);
                parse_row(&columns, &record, line)
            }
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or(fallback_line);
                Err(RowError::new(line, format!("Unreadable row: {}", err)))
            }
        };
        rows.push(parsed);
        if rows.len() > max_rows {
            return Err(CsvImportError::TooManyRows { max: max_rows });
        }
    }

    if rows.is_empty() {
        return Err(CsvImportError::Empty);
    }
    debug!("Parsed {} CSV rows", rows.len());
    Ok(rows)
}

fn parse_row(columns: &[Column], record: &StringRecord, line: u64) -> Result<StudentRow, RowError> {
    let mut row = StudentRow {
        line,
        first_name: String::new(),
        last_name: String::new(),
        admission_number: String::new(),
        date_of_birth: None,
        gender: None,
        guardian_name: None,
        phone: None,
        address: None,
        custom_fields: BTreeMap::new(),
    };
    let mut problems = Vec::new();

    for (column, value) in columns.iter().zip(record.iter()) {
        if value.is_empty() {
            continue;
        }
        let value = value.to_string();
        match column {
            Column::FirstName => row.first_name = value,
            Column::LastName => row.last_name = value,
            Column::AdmissionNumber => row.admission_number = value,
            Column::DateOfBirth => match parse_date(&value) {
                Some(date) => row.date_of_birth = Some(date),
                None => problems.push(format!("dateOfBirth '{}' is not a YYYY-MM-DD date", value)),
            },
            Column::Gender => row.gender = Some(value),
            Column::GuardianName => row.guardian_name = Some(value),
            Column::Phone => row.phone = Some(value),
            Column::Address => row.address = Some(value),
            Column::Custom(name) if !name.is_empty() => {
                row.custom_fields.insert(name.clone(), value);
            }
            Column::Custom(_) => {}
        }
    }

    for (required, value) in [
        (Column::FirstName, &row.first_name),
        (Column::LastName, &row.last_name),
        (Column::AdmissionNumber, &row.admission_number),
    ] {
        if value.is_empty() {
            problems.push(format!("{} is required", required.label()));
        }
    }

    if problems.is_empty() {
        Ok(row)
    } else {
        Err(RowError::new(line, problems.join("; ")))
    }
}
