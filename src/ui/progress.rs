use crate::batch::{ConversionEvent, EventKind};
use crate::ui::output::format_duration;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_file_progress(&self, total_files: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_files));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} files {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        pb.set_message("Reading cxr files...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi_progress.suspend(f)
        } else {
            f()
        }
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Advances the file bar once per input, whether it was parsed or skipped.
pub fn update_file_progress(pb: &ProgressBar, event: &ConversionEvent) {
    match event.kind {
        EventKind::FileStarted => pb.set_message(event.message.clone()),
        EventKind::FileParsed | EventKind::FileSkipped => pb.inc(1),
        EventKind::WorkbookStarted => pb.set_message("Writing xlsx..."),
        _ => {}
    }
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_manager_creation() {
        let manager = ProgressManager::new(true);
        assert!(manager.is_enabled());

        let disabled_manager = ProgressManager::new(false);
        assert!(!disabled_manager.is_enabled());
    }

    #[test]
    fn test_disabled_progress_bars() {
        let manager = ProgressManager::new(false);
        let file_pb = manager.create_file_progress(10);
        assert!(file_pb.is_hidden());
    }

    #[test]
    fn test_update_file_progress_counts_parsed_and_skipped() {
        let pb = ProgressBar::hidden();
        pb.set_length(3);

        update_file_progress(&pb, &ConversionEvent::info(EventKind::FileStarted, "a.cxr"));
        update_file_progress(&pb, &ConversionEvent::success(EventKind::FileParsed, "a.cxr"));
        update_file_progress(
            &pb,
            &ConversionEvent::warning(EventKind::RecordsMalformed, "a.cxr"),
        );
        update_file_progress(&pb, &ConversionEvent::warning(EventKind::FileSkipped, "b.cxr"));
        update_file_progress(
            &pb,
            &ConversionEvent::success(EventKind::WorkbookWritten, "out.xlsx"),
        );

        assert_eq!(pb.position(), 2);
    }
}
