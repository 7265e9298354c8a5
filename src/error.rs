use thiserror::Error;

#[derive(Error, Debug)]
pub enum Cxr2XlsxError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input file {path}: {reason}")]
    InvalidInput { path: String, reason: String },

    #[error("Expected at least 2 '{marker}' marker lines in {path}, found {found}")]
    MissingMarkers {
        path: String,
        marker: String,
        found: usize,
    },

    #[error("Malformed record at line {line} of {path}: expected 5 fields, found {fields}")]
    MalformedRecord {
        path: String,
        line: usize,
        fields: usize,
    },

    #[error("No variable records found in {path}")]
    EmptyRecordSet { path: String },

    #[error("First record of {path} (line {line}) has no address to name its sheet")]
    UnnamedSheet { path: String, line: usize },

    #[error("Sheet name count ({sheets}) does not match record set count ({record_sets})")]
    SheetCountMismatch { sheets: usize, record_sets: usize },

    #[error("Workbook operation failed: {message}")]
    Workbook {
        message: String,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("Could not decode {path} as {encoding}")]
    Encoding { path: String, encoding: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("No cxr files to convert")]
    NoInputFiles,

    #[error("Conversion failed: {message}")]
    ConversionFailed { message: String },
}

impl Cxr2XlsxError {
    /// Stable machine-readable code, also emitted in JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            Cxr2XlsxError::Io(_) => "E_IO",
            Cxr2XlsxError::InvalidInput { .. } => "E_INVALID_INPUT",
            Cxr2XlsxError::MissingMarkers { .. } => "E_MISSING_MARKERS",
            Cxr2XlsxError::MalformedRecord { .. } => "E_MALFORMED_RECORD",
            Cxr2XlsxError::EmptyRecordSet { .. } => "E_EMPTY_RECORD_SET",
            Cxr2XlsxError::UnnamedSheet { .. } => "E_UNNAMED_SHEET",
            Cxr2XlsxError::SheetCountMismatch { .. } => "E_SHEET_COUNT_MISMATCH",
            Cxr2XlsxError::Workbook { .. } => "E_WORKBOOK",
            Cxr2XlsxError::Encoding { .. } => "E_ENCODING",
            Cxr2XlsxError::Config { .. } => "E_CONFIG",
            Cxr2XlsxError::NoInputFiles => "E_NO_INPUT",
            Cxr2XlsxError::ConversionFailed { .. } => "E_CONVERSION_FAILED",
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Cxr2XlsxError {
    fn user_message(&self) -> String {
        match self {
            Cxr2XlsxError::InvalidInput { path, reason } => {
                format!("Cannot use {}: {}", path, reason)
            }
            Cxr2XlsxError::MissingMarkers {
                path,
                marker,
                found,
            } => {
                format!(
                    "{} does not look like a cxr export ({} '{}' line(s), 2 required)",
                    path, found, marker
                )
            }
            Cxr2XlsxError::MalformedRecord { path, line, fields } => {
                format!(
                    "Line {} of {} has {} field(s) instead of 5",
                    line, path, fields
                )
            }
            Cxr2XlsxError::EmptyRecordSet { path } => {
                format!("{} contains no variable records", path)
            }
            Cxr2XlsxError::UnnamedSheet { path, line } => {
                format!(
                    "Cannot name the sheet for {}: line {} is not a valid variable record",
                    path, line
                )
            }
            Cxr2XlsxError::SheetCountMismatch {
                sheets,
                record_sets,
            } => {
                format!(
                    "Sheet name list length ({}) does not match the number of cxr files ({})",
                    sheets, record_sets
                )
            }
            Cxr2XlsxError::Workbook { message, .. } => {
                format!("Failed to write workbook: {}", message)
            }
            Cxr2XlsxError::Encoding { path, encoding } => {
                format!("Could not decode {} using {}", path, encoding)
            }
            Cxr2XlsxError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            Cxr2XlsxError::NoInputFiles => "No cxr files to convert".to_string(),
            Cxr2XlsxError::ConversionFailed { message } => {
                format!("Conversion failed: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Cxr2XlsxError::InvalidInput { .. } => Some(
                "Pass existing files ending in .cxr, or a directory containing them.".to_string(),
            ),
            Cxr2XlsxError::MissingMarkers { .. } => Some(
                "Check that the file is a complete variable-table export, or set parser.marker in the configuration file.".to_string(),
            ),
            Cxr2XlsxError::MalformedRecord { .. } => Some(
                "Run without --strict to convert malformed lines into empty rows.".to_string(),
            ),
            Cxr2XlsxError::EmptyRecordSet { .. } => Some(
                "The variable table between the two marker lines is empty; re-export the file from the device software.".to_string(),
            ),
            Cxr2XlsxError::UnnamedSheet { .. } => Some(
                "The sheet name comes from the first variable's address; repair that line or re-export the file.".to_string(),
            ),
            Cxr2XlsxError::Encoding { .. } => Some(
                "Set --encoding to the file's text encoding (e.g. gbk, utf-8, windows-1252).".to_string(),
            ),
            Cxr2XlsxError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string(),
            ),
            Cxr2XlsxError::NoInputFiles => Some(
                "Provide .cxr files or directories as arguments, or use --list with a file of paths.".to_string(),
            ),
            Cxr2XlsxError::Workbook { .. } | Cxr2XlsxError::Io(_) => Some(
                "Ensure the output directory is writable and the target workbook is not open in another program.".to_string(),
            ),
            _ => None,
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for Cxr2XlsxError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        Cxr2XlsxError::Workbook {
            message: error.to_string(),
            source: error,
        }
    }
}

impl From<toml::de::Error> for Cxr2XlsxError {
    fn from(error: toml::de::Error) -> Self {
        Cxr2XlsxError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Cxr2XlsxError>;
