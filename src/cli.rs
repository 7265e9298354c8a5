use crate::config::{CliOverrides, Config, ConversionMode, ErrorPolicy};
use crate::error::Result;
use crate::scanner::{input_scanner::read_path_list, InputScanner};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cxr2xlsx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert cxr variable-table exports into Excel workbooks")]
#[command(
    long_about = "cxr2xlsx reads the variable table between the two SYMBOL marker lines of \
                  each .cxr file and writes it to xlsx, either as one workbook with a sheet \
                  per file or as one workbook per file."
)]
#[command(after_help = "EXAMPLES:\n  \
    cxr2xlsx X.cxr Y.cxr M.cxr\n  \
    cxr2xlsx exports/ --mode per-file --output-dir tables\n  \
    cxr2xlsx --list dropped-files.txt --continue-on-error\n  \
    cxr2xlsx exports/ --encoding gbk --strict --dry-run")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// cxr files or directories containing them
    pub inputs: Vec<PathBuf>,

    /// File with one input path per line
    #[arg(long, value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Conversion mode
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Directory the workbooks are written to
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prefix for generated workbook file names
    #[arg(long)]
    pub prefix: Option<String>,

    /// Fail on records that do not have exactly 5 fields
    #[arg(long)]
    pub strict: bool,

    /// Skip unreadable files instead of aborting the batch
    #[arg(long)]
    pub continue_on_error: bool,

    /// Text encoding of the cxr files (auto, utf-8, gbk, ...)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Only take cxr files directly inside input directories
    #[arg(long)]
    pub no_recursive: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Parse the inputs and report what would be written
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// One workbook, one sheet per input file
    Combined,
    /// One workbook per input file
    PerFile,
}

impl From<ModeArg> for ConversionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Combined => ConversionMode::Combined,
            ModeArg::PerFile => ConversionMode::PerFile,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_mode(self.mode.map(ConversionMode::from))
            .with_output_dir(self.output_dir.clone())
            .with_file_prefix(self.prefix.clone())
            .with_strict(self.strict.then_some(true))
            .with_encoding(self.encoding.clone())
            .with_on_error(self.continue_on_error.then_some(ErrorPolicy::Continue))
            .with_recursive(self.no_recursive.then_some(false))
    }

    /// Positional inputs followed by the `--list` entries, with directories
    /// expanded.
    pub fn collect_inputs(&self, config: &Config) -> Result<Vec<PathBuf>> {
        let mut inputs = self.inputs.clone();

        if let Some(ref list) = self.list {
            inputs.extend(read_path_list(list)?);
        }

        InputScanner::new(&config.batch).collect(&inputs)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cxr2xlsx").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = parse(&[
            "a.cxr",
            "b.cxr",
            "--mode",
            "per-file",
            "-o",
            "out",
            "--prefix",
            "Table-",
            "--strict",
            "--continue-on-error",
            "--encoding",
            "gbk",
            "--output-format",
            "json",
            "-vv",
        ]);

        assert_eq!(cli.inputs, vec![PathBuf::from("a.cxr"), PathBuf::from("b.cxr")]);
        assert_eq!(cli.mode, Some(ModeArg::PerFile));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert!(cli.strict);
        assert!(cli.continue_on_error);
        assert!(matches!(cli.output_format, OutputFormat::Json));
        assert_eq!(cli.verbosity_level(), 2);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["cxr2xlsx", "a.cxr", "-q", "-v"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_leave_unset_flags_alone() {
        let cli = parse(&["a.cxr"]);
        let overrides = cli.create_cli_overrides();

        assert!(overrides.mode.is_none());
        assert!(overrides.strict.is_none());
        assert!(overrides.on_error.is_none());
        assert!(overrides.recursive.is_none());
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("cxr2xlsx.toml");
        fs::write(
            &config_path,
            "[output]\nfile_prefix = \"变量表-\"\nmode = \"per-file\"\n",
        )
        .unwrap();

        let cli = parse(&[
            "a.cxr",
            "--config",
            config_path.to_str().unwrap(),
            "--mode",
            "combined",
            "--no-recursive",
        ]);
        let config = cli.load_config().unwrap();

        assert_eq!(config.output.file_prefix, "变量表-");
        assert_eq!(config.output.mode, ConversionMode::Combined);
        assert!(!config.batch.recursive);
    }

    #[test]
    fn test_load_config_rejects_unknown_encoding() {
        let cli = parse(&["a.cxr", "--encoding", "klingon"]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_collect_inputs_merges_list_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        fs::write(dir.join("a.cxr"), "").unwrap();
        fs::write(dir.join("b.cxr"), "").unwrap();
        let list = dir.join("list.txt");
        fs::write(
            &list,
            format!(
                "{}\n\n{}\n",
                dir.join("b.cxr").display(),
                dir.join("a.cxr").display()
            ),
        )
        .unwrap();

        let cli = parse(&[
            dir.join("a.cxr").to_str().unwrap(),
            "--list",
            list.to_str().unwrap(),
        ]);
        let inputs = cli.collect_inputs(&Config::default()).unwrap();

        assert_eq!(inputs, vec![dir.join("a.cxr"), dir.join("b.cxr")]);
    }
}
