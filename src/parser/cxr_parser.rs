use crate::config::ParserConfig;
use crate::error::{Cxr2XlsxError, Result};
use crate::parser::record::VariableRecord;
use encoding_rs::Encoding;
use std::fs;
use std::path::{Path, PathBuf};

pub const CXR_EXTENSION: &str = "cxr";
pub const DEFAULT_MARKER: &str = "SYMBOL";

/// Characters wrapped around every record line: a fixed-width prefix and a
/// suffix that includes the line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    pub prefix: usize,
    pub suffix: usize,
}

impl Framing {
    pub const fn new(prefix: usize, suffix: usize) -> Self {
        Self { prefix, suffix }
    }

    /// Removes the framing, counting in characters. Lines no longer than the
    /// framing itself yield an empty body.
    pub fn strip<'a>(&self, line: &'a str) -> &'a str {
        let char_count = line.chars().count();
        if char_count <= self.prefix + self.suffix {
            return "";
        }

        let byte_offset = |nth: usize| {
            line.char_indices()
                .nth(nth)
                .map(|(index, _)| index)
                .unwrap_or(line.len())
        };

        &line[byte_offset(self.prefix)..byte_offset(char_count - self.suffix)]
    }
}

impl Default for Framing {
    fn default() -> Self {
        Self::new(5, 2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPolicy {
    /// Malformed lines become empty records.
    Lenient,
    /// Malformed lines fail the file with `MalformedRecord`.
    Strict,
}

#[derive(Debug, Clone, Copy)]
pub enum TextEncoding {
    /// UTF-8, falling back to GBK.
    Auto,
    Fixed(&'static Encoding),
}

impl TextEncoding {
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("auto") {
            return Some(TextEncoding::Auto);
        }
        Encoding::for_label(label.as_bytes()).map(TextEncoding::Fixed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Auto => "UTF-8/GBK",
            TextEncoding::Fixed(encoding) => encoding.name(),
        }
    }
}

/// Records extracted from one cxr file.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub source: PathBuf,
    pub records: Vec<VariableRecord>,
    /// 1-based line numbers that were replaced by empty records.
    pub malformed_lines: Vec<usize>,
    /// 0-based indices of the two marker lines bounding the table.
    pub marker_lines: (usize, usize),
}

impl ParsedTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sheet name derived from the first record's address. `None` when the
    /// table is empty or the first record carries no address.
    pub fn sheet_name(&self) -> Option<String> {
        self.records
            .first()
            .filter(|record| !record.address.is_empty())
            .map(VariableRecord::sheet_name)
    }

    /// 1-based line number of the first record.
    pub fn first_record_line(&self) -> usize {
        self.marker_lines.0 + 2
    }

    pub fn into_records(self) -> Vec<VariableRecord> {
        self.records
    }
}

pub struct CxrParser {
    marker: String,
    framing: Framing,
    policy: RecordPolicy,
    encoding: TextEncoding,
}

impl CxrParser {
    pub fn new() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            framing: Framing::default(),
            policy: RecordPolicy::Lenient,
            encoding: TextEncoding::Auto,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Result<Self> {
        let encoding =
            TextEncoding::from_label(&config.encoding).ok_or_else(|| Cxr2XlsxError::Config {
                message: format!("Unknown text encoding: {}", config.encoding),
            })?;

        let policy = if config.strict {
            RecordPolicy::Strict
        } else {
            RecordPolicy::Lenient
        };

        Ok(Self::new()
            .with_marker(config.marker.clone())
            .with_framing(Framing::new(config.prefix_len, config.suffix_len))
            .with_policy(policy)
            .with_encoding(encoding))
    }

    pub fn with_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_policy(mut self, policy: RecordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn policy(&self) -> RecordPolicy {
        self.policy
    }

    /// Reads and parses a `.cxr` file.
    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<ParsedTable> {
        let path = path.as_ref();
        validate_cxr_path(path)?;

        let bytes = fs::read(path)?;
        let text = self.decode(&bytes, path)?;

        let mut table = self.parse_str(&text, &path.display().to_string())?;
        table.source = path.to_path_buf();
        Ok(table)
    }

    /// Parses cxr text already in memory. `source` only labels errors.
    pub fn parse_str(&self, text: &str, source: &str) -> Result<ParsedTable> {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let lines: Vec<&str> = normalized.split_inclusive('\n').collect();

        let (start, end) = self.locate_table(&lines, source)?;

        let mut records = Vec::with_capacity(end - start - 1);
        let mut malformed_lines = Vec::new();

        for (index, line) in lines.iter().enumerate().take(end).skip(start + 1) {
            let fields = split_fields(self.framing.strip(line));

            match VariableRecord::from_fields(&fields) {
                Some(record) => records.push(record),
                None => match self.policy {
                    RecordPolicy::Strict => {
                        return Err(Cxr2XlsxError::MalformedRecord {
                            path: source.to_string(),
                            line: index + 1,
                            fields: fields.len(),
                        });
                    }
                    RecordPolicy::Lenient => {
                        malformed_lines.push(index + 1);
                        records.push(VariableRecord::empty());
                    }
                },
            }
        }

        Ok(ParsedTable {
            source: PathBuf::from(source),
            records,
            malformed_lines,
            marker_lines: (start, end),
        })
    }

    /// Indices of the first two lines containing the marker.
    fn locate_table(&self, lines: &[&str], source: &str) -> Result<(usize, usize)> {
        let markers: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(self.marker.as_str()))
            .map(|(index, _)| index)
            .collect();

        match markers.as_slice() {
            [start, end, ..] => Ok((*start, *end)),
            _ => Err(Cxr2XlsxError::MissingMarkers {
                path: source.to_string(),
                marker: self.marker.clone(),
                found: markers.len(),
            }),
        }
    }

    fn decode(&self, bytes: &[u8], path: &Path) -> Result<String> {
        let encoding_error = || Cxr2XlsxError::Encoding {
            path: path.display().to_string(),
            encoding: self.encoding.name().to_string(),
        };

        match self.encoding {
            TextEncoding::Auto => match std::str::from_utf8(bytes) {
                Ok(text) => Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string()),
                Err(_) => {
                    let (text, had_errors) = encoding_rs::GBK.decode_without_bom_handling(bytes);
                    if had_errors {
                        return Err(encoding_error());
                    }
                    Ok(text.into_owned())
                }
            },
            TextEncoding::Fixed(encoding) => {
                let (text, _, had_errors) = encoding.decode(bytes);
                if had_errors {
                    return Err(encoding_error());
                }
                Ok(text.into_owned())
            }
        }
    }
}

impl Default for CxrParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a record body on horizontal tabs.
pub fn split_fields(body: &str) -> Vec<&str> {
    body.split('\t').collect()
}

pub fn is_cxr_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == CXR_EXTENSION)
}

fn validate_cxr_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Cxr2XlsxError::InvalidInput {
            path: path.display().to_string(),
            reason: "file does not exist".to_string(),
        });
    }

    if !path.is_file() {
        return Err(Cxr2XlsxError::InvalidInput {
            path: path.display().to_string(),
            reason: "not a regular file".to_string(),
        });
    }

    if !is_cxr_file(path) {
        return Err(Cxr2XlsxError::InvalidInput {
            path: path.display().to_string(),
            reason: format!("expected a .{} file", CXR_EXTENSION),
        });
    }

    Ok(())
}
