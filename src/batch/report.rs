use crate::config::ConversionMode;
use crate::error::Cxr2XlsxError;
use crate::parser::ParsedTable;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const STATUS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BatchStarted,
    FileStarted,
    FileParsed,
    RecordsMalformed,
    FileSkipped,
    WorkbookStarted,
    WorkbookWritten,
    BatchFinished,
    BatchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Failure,
}

/// A timestamped status line emitted while a batch runs.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionEvent {
    pub timestamp: DateTime<Local>,
    pub kind: EventKind,
    pub level: EventLevel,
    pub message: String,
}

impl ConversionEvent {
    pub fn new<S: Into<String>>(kind: EventKind, level: EventLevel, message: S) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            level,
            message: message.into(),
        }
    }

    pub fn info<S: Into<String>>(kind: EventKind, message: S) -> Self {
        Self::new(kind, EventLevel::Info, message)
    }

    pub fn success<S: Into<String>>(kind: EventKind, message: S) -> Self {
        Self::new(kind, EventLevel::Success, message)
    }

    pub fn warning<S: Into<String>>(kind: EventKind, message: S) -> Self {
        Self::new(kind, EventLevel::Warning, message)
    }

    pub fn failure<S: Into<String>>(kind: EventKind, message: S) -> Self {
        Self::new(kind, EventLevel::Failure, message)
    }

    /// `[2024-01-31 08:00:00] message`
    pub fn status_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.format(STATUS_TIME_FORMAT),
            self.message
        )
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub sheet_name: Option<String>,
    pub record_count: usize,
    pub malformed_lines: Vec<usize>,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
    pub error_code: Option<&'static str>,
}

impl FileOutcome {
    pub fn parsed(table: &ParsedTable, sheet_name: String) -> Self {
        Self {
            source: table.source.clone(),
            sheet_name: Some(sheet_name),
            record_count: table.len(),
            malformed_lines: table.malformed_lines.clone(),
            output: None,
            error: None,
            error_code: None,
        }
    }

    pub fn failed(source: &Path, error: &Cxr2XlsxError) -> Self {
        Self {
            source: source.to_path_buf(),
            sheet_name: None,
            record_count: 0,
            malformed_lines: Vec::new(),
            output: None,
            error: Some(error.to_string()),
            error_code: Some(error.code()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub mode: ConversionMode,
    pub dry_run: bool,
    /// Absolute paths of the workbooks produced, in creation order.
    pub outputs: Vec<PathBuf>,
    pub files: Vec<FileOutcome>,
    pub started_at: DateTime<Local>,
    pub duration: Duration,
}

impl ConversionReport {
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|f| f.record_count).sum()
    }

    pub fn malformed_line_count(&self) -> usize {
        self.files.iter().map(|f| f.malformed_lines.len()).sum()
    }

    pub fn converted_files(&self) -> usize {
        self.files.iter().filter(|f| f.succeeded()).count()
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files.iter().filter(|f| !f.succeeded())
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| !f.succeeded())
    }
}
