use clap::Parser;
use cxr2xlsx::{Cli, Cxr2Xlsx, Cxr2XlsxError, OutputFormatter, OutputMode, UserFriendlyError};
use std::process;

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let app = match Cxr2Xlsx::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for(&e);
        }
    };

    let inputs = match cli.collect_inputs(app.config()) {
        Ok(inputs) => inputs,
        Err(e) => {
            app.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    match app.convert(&inputs) {
        Ok(report) => {
            app.output_formatter().print_conversion_report(&report);

            if report.has_failures() {
                2 // Some files were skipped
            } else {
                0
            }
        }
        Err(e) => {
            app.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &Cxr2XlsxError) -> i32 {
    match error {
        Cxr2XlsxError::InvalidInput { .. } => 3,
        Cxr2XlsxError::MissingMarkers { .. } => 4,
        Cxr2XlsxError::MalformedRecord { .. } => 5,
        Cxr2XlsxError::EmptyRecordSet { .. } => 6,
        Cxr2XlsxError::Encoding { .. } => 7,
        Cxr2XlsxError::Workbook { .. } => 8,
        Cxr2XlsxError::SheetCountMismatch { .. } => 9,
        Cxr2XlsxError::NoInputFiles => 10,
        Cxr2XlsxError::Config { .. } => 11,
        Cxr2XlsxError::UnnamedSheet { .. } => 12,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "cxr2xlsx.toml".to_string());

    match Cxr2Xlsx::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  cxr2xlsx <files...> --config {}", config_path);
            println!("\nSet output.file_prefix = \"变量表-\" to reproduce the legacy file names.");
            0
        }
        Err(e) => {
            eprintln!(
                "Failed to generate configuration file: {}",
                e.user_message()
            );
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn print_startup_error(error: &Cxr2XlsxError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli::try_parse_from([
            "cxr2xlsx",
            "--generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(handle_generate_config(&cli), 0);

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[parser]"));
        assert!(content.contains("marker = \"SYMBOL\""));
    }

    #[test]
    fn test_generate_config_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("missing").join("test.toml");

        let cli = Cli::try_parse_from([
            "cxr2xlsx",
            "--generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(handle_generate_config(&cli), 1);
    }

    #[test]
    fn test_exit_codes_are_distinct_per_error_kind() {
        let errors = [
            Cxr2XlsxError::InvalidInput {
                path: "a".to_string(),
                reason: "missing".to_string(),
            },
            Cxr2XlsxError::MissingMarkers {
                path: "a".to_string(),
                marker: "SYMBOL".to_string(),
                found: 0,
            },
            Cxr2XlsxError::MalformedRecord {
                path: "a".to_string(),
                line: 3,
                fields: 4,
            },
            Cxr2XlsxError::EmptyRecordSet {
                path: "a".to_string(),
            },
            Cxr2XlsxError::UnnamedSheet {
                path: "a".to_string(),
                line: 3,
            },
            Cxr2XlsxError::NoInputFiles,
            Cxr2XlsxError::Config {
                message: "bad".to_string(),
            },
        ];

        let mut codes: Vec<i32> = errors.iter().map(exit_code_for).collect();
        assert!(codes.iter().all(|&code| code != 0 && code != 2));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
