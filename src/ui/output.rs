use crate::batch::{ConversionEvent, ConversionReport, EventKind, EventLevel};
use crate::config::ConversionMode;
use crate::error::{Cxr2XlsxError, UserFriendlyError};
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    #[allow(dead_code)]
    term: Term,
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            term,
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    /// Renders one batch status line. Per-file progress lines only show with `-v`;
    /// failures are always shown.
    pub fn print_event(&self, event: &ConversionEvent) {
        let visible = match event.level {
            EventLevel::Failure => true,
            _ => self.should_show_message(event_verbosity(event.kind)),
        };
        if !visible {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                let message_type = match event.level {
                    EventLevel::Info => MessageType::Info,
                    EventLevel::Success => MessageType::Success,
                    EventLevel::Warning => MessageType::Warning,
                    EventLevel::Failure => MessageType::Error,
                };
                self.print_human_message(message_type, &event.status_line());
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "event",
                    "kind": event.kind,
                    "level": event.level,
                    "message": event.message,
                    "timestamp": event.timestamp.to_rfc3339()
                }));
            }
            OutputMode::Plain => {
                let label = match event.level {
                    EventLevel::Info => "INFO",
                    EventLevel::Success => "SUCCESS",
                    EventLevel::Warning => "WARNING",
                    EventLevel::Failure => "ERROR",
                };
                match event.level {
                    EventLevel::Failure => eprintln!("{}: {}", label, event.status_line()),
                    _ => println!("{}: {}", label, event.status_line()),
                }
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &Cxr2XlsxError) {
        if self.mode == OutputMode::Json {
            self.print_json_object(&serde_json::json!({
                "type": "error",
                "code": error.code(),
                "message": error.user_message(),
                "suggestion": error.suggestion(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }));
            return;
        }

        self.error(&format!("{} [{}]", error.user_message(), error.code()));

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                _ => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    pub fn print_conversion_report(&self, report: &ConversionReport) {
        match self.mode {
            OutputMode::Human => {
                if !self.quiet {
                    self.print_human_report(report);
                }
            }
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => self.print_plain_report(report),
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }

    fn print_human_report(&self, report: &ConversionReport) {
        let title = if report.dry_run {
            "Conversion Plan (dry run)"
        } else {
            "Conversion Report"
        };
        self.print_header(title);

        println!("  Mode:            {}", mode_label(report.mode));
        println!(
            "  Files converted: {}",
            self.highlight(format!("{}/{}", report.converted_files(), report.files.len()))
        );
        println!(
            "  Records:         {}",
            self.highlight(report.total_records().to_string())
        );
        if report.malformed_line_count() > 0 {
            println!("  Malformed lines: {}", report.malformed_line_count());
        }
        println!(
            "  Time taken:      {}",
            self.highlight(format_duration(report.duration))
        );

        if !report.outputs.is_empty() {
            println!();
            println!(
                "{}",
                if report.dry_run {
                    "Would write:"
                } else {
                    "Workbooks written:"
                }
            );
            for output in &report.outputs {
                println!("  {}", output.display());
            }
        }

        if report.has_failures() {
            println!();
            println!("Files skipped:");
            for outcome in report.failed_files() {
                println!(
                    "  - {}: {} [{}]",
                    outcome.source.display(),
                    outcome.error.as_deref().unwrap_or("unknown error"),
                    outcome.error_code.unwrap_or("E_UNKNOWN")
                );
            }
        }

        self.print_separator();
    }

    fn print_plain_report(&self, report: &ConversionReport) {
        println!(
            "REPORT: Conversion {}",
            if report.dry_run { "planned" } else { "completed" }
        );
        println!("Mode: {}", mode_label(report.mode));
        println!("Files: {}/{}", report.converted_files(), report.files.len());
        println!("Records: {}", report.total_records());
        println!("Malformed lines: {}", report.malformed_line_count());
        println!("Duration: {:?}", report.duration);
        for output in &report.outputs {
            println!("Output: {}", output.display());
        }
        for outcome in report.failed_files() {
            println!(
                "Skipped: {} ({})",
                outcome.source.display(),
                outcome.error_code.unwrap_or("E_UNKNOWN")
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn event_verbosity(kind: EventKind) -> u8 {
    match kind {
        EventKind::FileStarted | EventKind::FileParsed | EventKind::WorkbookStarted => 1,
        _ => 0,
    }
}

fn mode_label(mode: ConversionMode) -> &'static str {
    match mode {
        ConversionMode::Combined => "combined workbook",
        ConversionMode::PerFile => "one workbook per file",
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Routes formatter output through the progress bars so lines are not torn.
pub struct ProgressAwareOutput<'a> {
    formatter: &'a OutputFormatter,
    progress_manager: Option<&'a crate::ui::ProgressManager>,
}

impl<'a> ProgressAwareOutput<'a> {
    pub fn new(
        formatter: &'a OutputFormatter,
        progress_manager: Option<&'a crate::ui::ProgressManager>,
    ) -> Self {
        Self {
            formatter,
            progress_manager,
        }
    }

    pub fn suspend_and_print<F>(&self, f: F)
    where
        F: FnOnce(&OutputFormatter),
    {
        if let Some(pm) = self.progress_manager {
            pm.suspend(|| f(self.formatter));
        } else {
            f(self.formatter);
        }
    }

    pub fn event(&self, event: &ConversionEvent) {
        self.suspend_and_print(|f| f.print_event(event));
    }
}
