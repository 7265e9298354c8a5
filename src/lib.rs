pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod parser;
pub mod scanner;
pub mod ui;
pub mod writer;

// Public API re-exports
pub use cli::{Cli, ModeArg, OutputFormat};
pub use config::{
    BatchConfig, CliOverrides, Config, ConversionMode, ErrorPolicy, OutputConfig, ParserConfig,
};
pub use error::{Cxr2XlsxError, Result, UserFriendlyError};

// Core functionality re-exports
pub use batch::{BatchConverter, ConversionEvent, ConversionReport, EventKind, EventLevel};
pub use parser::{sheet_name_for, CxrParser, ParsedTable, VariableRecord};
pub use scanner::InputScanner;
pub use ui::{OutputFormatter, OutputMode, ProgressAwareOutput, ProgressManager};
pub use writer::WorkbookWriter;

use std::path::{Path, PathBuf};

/// Main library interface: runs a batch with status output and a progress bar.
pub struct Cxr2Xlsx {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    dry_run: bool,
}

impl Cxr2Xlsx {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        config.validate()?;

        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            dry_run: false,
        })
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = match cli_args.output_format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        };

        Ok(Self::new(
            config,
            output_mode,
            cli_args.verbosity_level(),
            cli_args.quiet,
        )?
            .with_dry_run(cli_args.dry_run))
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Converts `inputs` using the configured mode, streaming status lines to
    /// the output formatter.
    pub fn convert(&self, inputs: &[PathBuf]) -> Result<ConversionReport> {
        let mode = self.config.output.mode;

        if self.dry_run {
            self.output_formatter
                .info("DRY RUN MODE - No workbooks will be written");
        }
        self.output_formatter.start_operation(&format!(
            "Converting {} cxr file(s) into {}",
            inputs.len(),
            self.config.output.directory.display()
        ));

        self.output_formatter.debug(&format!(
            "Marker {:?}, encoding {}, prefix {:?}, mode {:?}",
            self.config.parser.marker,
            self.config.parser.encoding,
            self.config.output.file_prefix,
            mode
        ));

        let converter = BatchConverter::from_config(&self.config)?.with_dry_run(self.dry_run);

        let file_progress = self
            .progress_manager
            .create_file_progress(inputs.len() as u64);
        let output = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));
        let on_event = |event: &ConversionEvent| {
            ui::progress::update_file_progress(&file_progress, event);
            output.event(event);
        };

        let result = converter.convert(inputs, mode, Some(&on_event));

        match &result {
            Ok(report) => ui::progress::finish_progress_with_summary(
                &file_progress,
                &format!("Converted {} file(s)", report.converted_files()),
                report.duration,
            ),
            Err(_) => file_progress.abandon_with_message("Conversion failed"),
        }
        self.progress_manager.clear();

        result
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn handle_error(&self, error: &Cxr2XlsxError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Converts with default settings and no terminal output.
pub fn convert_files<P: AsRef<Path>>(
    paths: &[P],
    output_dir: &Path,
    mode: ConversionMode,
) -> Result<ConversionReport> {
    let converter = BatchConverter::new(CxrParser::new(), output_dir);
    converter.convert(paths, mode, None)
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cxr2xlsx {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}
