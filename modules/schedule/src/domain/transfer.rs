//! CSV and JSON file formats for exporting and importing a user's schedule.
//!
//! CSV files come in two shapes, one per entity, told apart by their header
//! row. JSON carries both lists in one document. Rows are parsed into raw
//! `NewCourse`/`NewExam` values; validation happens in the service so that
//! imports follow exactly the same rules as interactive creation.

use serde::{Deserialize, Serialize};

use crate::contract::model::{Course, Exam, NewCourse, NewExam, Schedule};
use crate::domain::error::DomainError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const COURSE_HEADERS: [&str; 5] = ["title", "day", "start", "end", "mode"];
pub const EXAM_HEADERS: [&str; 5] = ["title", "kind", "date", "start", "end"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Csv,
    Json,
}

/// Chooses the import format from the optional filename, then the content
/// type, then the first non-blank byte of the body.
pub fn detect_format(filename: Option<&str>, content_type: Option<&str>, body: &[u8]) -> ImportFormat {
    if let Some(name) = filename.map(str::to_ascii_lowercase) {
        if name.ends_with(".json") {
            return ImportFormat::Json;
        }
        if name.ends_with(".csv") {
            return ImportFormat::Csv;
        }
    }
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json")) {
        return ImportFormat::Json;
    }
    match strip_bom(body).iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => ImportFormat::Json,
        _ => ImportFormat::Csv,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRow {
    pub title: String,
    pub day: String,
    pub start: String,
    pub end: String,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamRow {
    pub title: String,
    pub kind: String,
    pub date: String,
    pub start: String,
    pub end: String,
}

/// `{"courses": [...], "exams": [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseRow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exams: Option<Vec<ExamRow>>,
}

impl From<&Course> for CourseRow {
    fn from(c: &Course) -> Self {
        Self {
            title: c.title.clone(),
            day: c.day.to_string(),
            start: c.start.clone(),
            end: c.end.clone(),
            mode: c.mode.to_string(),
        }
    }
}

impl From<&Exam> for ExamRow {
    fn from(e: &Exam) -> Self {
        Self {
            title: e.title.clone(),
            kind: e.kind.to_string(),
            date: e.date.clone(),
            start: e.start.clone(),
            end: e.end.clone(),
        }
    }
}

impl From<CourseRow> for NewCourse {
    fn from(r: CourseRow) -> Self {
        Self {
            title: r.title,
            day: r.day,
            start: r.start,
            end: r.end,
            mode: r.mode,
        }
    }
}

impl From<ExamRow> for NewExam {
    fn from(r: ExamRow) -> Self {
        Self {
            title: r.title,
            kind: r.kind,
            date: r.date,
            start: r.start,
            end: r.end,
        }
    }
}

/// Rows read from an import file, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub courses: Vec<NewCourse>,
    pub exams: Vec<NewExam>,
}

pub fn parse_import(format: ImportFormat, body: &[u8]) -> Result<ParsedImport, DomainError> {
    match format {
        ImportFormat::Csv => parse_csv(body),
        ImportFormat::Json => parse_json(body),
    }
}

pub fn parse_json(body: &[u8]) -> Result<ParsedImport, DomainError> {
    let doc: ScheduleDocument = serde_json::from_slice(strip_bom(body))
        .map_err(|e| DomainError::import(format!("malformed JSON: {e}")))?;
    if doc.courses.is_none() && doc.exams.is_none() {
        return Err(DomainError::import(
            "JSON document must contain a \"courses\" or \"exams\" list",
        ));
    }
    Ok(ParsedImport {
        courses: doc.courses.unwrap_or_default().into_iter().map(Into::into).collect(),
        exams: doc.exams.unwrap_or_default().into_iter().map(Into::into).collect(),
    })
}

pub fn parse_csv(body: &[u8]) -> Result<ParsedImport, DomainError> {
    let body = strip_bom(body);
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(DomainError::import("file is empty"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(body);

    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| DomainError::import(format!("unreadable header row: {e}")))?
        .iter()
        .map(str::to_ascii_lowercase)
        .collect();
    reader.set_headers(headers.clone());

    let mut parsed = ParsedImport::default();
    if same_columns(&headers, &COURSE_HEADERS) {
        for record in reader.records() {
            let row: CourseRow = decode_record(record, &headers)?;
            parsed.courses.push(row.into());
        }
    } else if same_columns(&headers, &EXAM_HEADERS) {
        for record in reader.records() {
            let row: ExamRow = decode_record(record, &headers)?;
            parsed.exams.push(row.into());
        }
    } else {
        let got: Vec<&str> = headers.iter().collect();
        return Err(DomainError::import(format!(
            "unrecognized CSV header [{}]; expected [{}] or [{}]",
            got.join(","),
            COURSE_HEADERS.join(","),
            EXAM_HEADERS.join(",")
        )));
    }
    Ok(parsed)
}

fn decode_record<T: serde::de::DeserializeOwned>(
    record: Result<csv::StringRecord, csv::Error>,
    headers: &csv::StringRecord,
) -> Result<T, DomainError> {
    let record = record.map_err(|e| match e.position() {
        Some(p) => DomainError::import(format!("line {}: {e}", p.line())),
        None => DomainError::import(e.to_string()),
    })?;
    record.deserialize(Some(headers)).map_err(|e| match record.position() {
        Some(p) => DomainError::import(format!("line {}: {e}", p.line())),
        None => DomainError::import(e.to_string()),
    })
}

fn same_columns(headers: &csv::StringRecord, expected: &[&str]) -> bool {
    headers.len() == expected.len() && expected.iter().all(|col| headers.iter().any(|h| h == *col))
}

fn strip_bom(body: &[u8]) -> &[u8] {
    body.strip_prefix(UTF8_BOM).unwrap_or(body)
}

pub fn courses_to_csv(courses: &[Course]) -> anyhow::Result<Vec<u8>> {
    let mut out = UTF8_BOM.to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut out);
        writer.write_record(COURSE_HEADERS)?;
        for c in courses {
            writer.serialize(CourseRow::from(c))?;
        }
        writer.flush()?;
    }
    Ok(out)
}

pub fn exams_to_csv(exams: &[Exam]) -> anyhow::Result<Vec<u8>> {
    let mut out = UTF8_BOM.to_vec();
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut out);
        writer.write_record(EXAM_HEADERS)?;
        for e in exams {
            writer.serialize(ExamRow::from(e))?;
        }
        writer.flush()?;
    }
    Ok(out)
}

pub fn schedule_to_json(schedule: &Schedule) -> anyhow::Result<String> {
    let doc = ScheduleDocument {
        courses: Some(schedule.courses.iter().map(CourseRow::from).collect()),
        exams: Some(schedule.exams.iter().map(ExamRow::from).collect()),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}
