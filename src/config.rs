use crate::error::{Cxr2XlsxError, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub output: OutputConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    pub marker: String,
    pub prefix_len: usize,
    pub suffix_len: usize,
    pub strict: bool,
    pub encoding: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    pub timestamp_format: String,
    pub mode: ConversionMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    pub on_error: ErrorPolicy,
    pub recursive: bool,
    pub max_depth: usize,
}

/// Combined writes one workbook with a sheet per input; per-file writes one workbook each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionMode {
    #[default]
    Combined,
    PerFile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Continue,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            marker: "SYMBOL".to_string(),
            prefix_len: 5,
            suffix_len: 2,
            strict: false,
            encoding: "auto".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            file_prefix: "Variable-Table-".to_string(),
            timestamp_format: "%Y%m%d-%H%M%S".to_string(),
            mode: ConversionMode::Combined,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            on_error: ErrorPolicy::Abort,
            recursive: true,
            max_depth: 8,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Cxr2XlsxError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| Cxr2XlsxError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| Cxr2XlsxError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["cxr2xlsx.toml", ".cxr2xlsx.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(mode) = cli_args.mode {
            self.output.mode = mode;
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.directory = output_dir.clone();
        }

        if let Some(ref prefix) = cli_args.file_prefix {
            self.output.file_prefix = prefix.clone();
        }

        if let Some(strict) = cli_args.strict {
            self.parser.strict = strict;
        }

        if let Some(ref encoding) = cli_args.encoding {
            self.parser.encoding = encoding.trim().to_lowercase();
        }

        if let Some(on_error) = cli_args.on_error {
            self.batch.on_error = on_error;
        }

        if let Some(recursive) = cli_args.recursive {
            self.batch.recursive = recursive;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| Cxr2XlsxError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| Cxr2XlsxError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.parser.marker.is_empty() {
            return Err(Cxr2XlsxError::Config {
                message: "Marker token must not be empty".to_string(),
            });
        }

        if self.parser.encoding != "auto"
            && encoding_rs::Encoding::for_label(self.parser.encoding.as_bytes()).is_none()
        {
            return Err(Cxr2XlsxError::Config {
                message: format!("Unknown text encoding: {}", self.parser.encoding),
            });
        }

        if self.output.file_prefix.trim().is_empty() {
            return Err(Cxr2XlsxError::Config {
                message: "Output file prefix must not be empty".to_string(),
            });
        }

        if self.output.file_prefix.contains(['/', '\\']) {
            return Err(Cxr2XlsxError::Config {
                message: format!(
                    "Output file prefix must not contain path separators: {}",
                    self.output.file_prefix
                ),
            });
        }

        if self.output.timestamp_format.trim().is_empty() {
            return Err(Cxr2XlsxError::Config {
                message: "Timestamp format must not be empty".to_string(),
            });
        }

        if StrftimeItems::new(&self.output.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(Cxr2XlsxError::Config {
                message: format!(
                    "Invalid timestamp format: {}",
                    self.output.timestamp_format
                ),
            });
        }

        if self.batch.max_depth == 0 {
            return Err(Cxr2XlsxError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if self.output.directory.exists() && !self.output.directory.is_dir() {
            return Err(Cxr2XlsxError::Config {
                message: format!(
                    "Output path is not a directory: {}",
                    self.output.directory.display()
                ),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.output.directory = PathBuf::from(".");
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub mode: Option<ConversionMode>,
    pub output_dir: Option<PathBuf>,
    pub file_prefix: Option<String>,
    pub strict: Option<bool>,
    pub encoding: Option<String>,
    pub on_error: Option<ErrorPolicy>,
    pub recursive: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: Option<ConversionMode>) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_file_prefix(mut self, prefix: Option<String>) -> Self {
        self.file_prefix = prefix;
        self
    }

    pub fn with_strict(mut self, strict: Option<bool>) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_encoding(mut self, encoding: Option<String>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_on_error(mut self, on_error: Option<ErrorPolicy>) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_recursive(mut self, recursive: Option<bool>) -> Self {
        self.recursive = recursive;
        self
    }
}
