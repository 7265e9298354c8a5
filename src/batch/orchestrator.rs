use crate::batch::report::{ConversionEvent, ConversionReport, EventKind, FileOutcome};
use crate::config::{Config, ConversionMode, ErrorPolicy};
use crate::error::{Cxr2XlsxError, Result};
use crate::parser::{CxrParser, ParsedTable, VariableRecord};
use crate::writer::{ensure_xlsx_extension, WorkbookWriter};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Sheet names and record lists collected during one batch, in input order.
#[derive(Debug, Default)]
pub struct BatchAccumulator {
    sheet_names: Vec<String>,
    record_lists: Vec<Vec<VariableRecord>>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sheet_name: String, records: Vec<VariableRecord>) {
        self.sheet_names.push(sheet_name);
        self.record_lists.push(records);
    }

    pub fn len(&self) -> usize {
        self.sheet_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheet_names.is_empty()
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    pub fn record_lists(&self) -> &[Vec<VariableRecord>] {
        &self.record_lists
    }
}

pub type EventCallback<'a> = &'a dyn Fn(&ConversionEvent);

/// Drives the parser over a list of paths and writes the resulting workbooks.
pub struct BatchConverter {
    parser: CxrParser,
    writer: WorkbookWriter,
    output_directory: PathBuf,
    file_prefix: String,
    timestamp_format: String,
    on_error: ErrorPolicy,
    dry_run: bool,
}

impl BatchConverter {
    pub fn new<P: Into<PathBuf>>(parser: CxrParser, output_directory: P) -> Self {
        Self {
            parser,
            writer: WorkbookWriter::new(),
            output_directory: output_directory.into(),
            file_prefix: "Variable-Table-".to_string(),
            timestamp_format: "%Y%m%d-%H%M%S".to_string(),
            on_error: ErrorPolicy::Abort,
            dry_run: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let parser = CxrParser::from_config(&config.parser)?;

        Ok(Self::new(parser, config.output.directory.clone())
            .with_file_prefix(config.output.file_prefix.clone())
            .with_timestamp_format(config.output.timestamp_format.clone())
            .with_error_policy(config.batch.on_error))
    }

    pub fn with_file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_timestamp_format<S: Into<String>>(mut self, format: S) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_writer(mut self, writer: WorkbookWriter) -> Self {
        self.writer = writer;
        self
    }

    /// `<dir>/<prefix><sheet>.xlsx`
    pub fn per_file_output_path(&self, sheet_name: &str) -> PathBuf {
        self.output_directory
            .join(format!("{}{}.xlsx", self.file_prefix, sheet_name))
    }

    /// `<dir>/<prefix><timestamp>.xlsx`
    pub fn combined_output_path(&self, at: DateTime<Local>) -> PathBuf {
        self.output_directory.join(format!(
            "{}{}.xlsx",
            self.file_prefix,
            at.format(&self.timestamp_format)
        ))
    }

    /// Converts every non-blank path in order.
    ///
    /// Under `ErrorPolicy::Abort` the first failure stops the batch and is
    /// returned; workbooks already written stay on disk. Under
    /// `ErrorPolicy::Continue` files that cannot be parsed are recorded in the
    /// report and skipped, while write failures still abort.
    pub fn convert<P: AsRef<Path>>(
        &self,
        paths: &[P],
        mode: ConversionMode,
        events: Option<EventCallback<'_>>,
    ) -> Result<ConversionReport> {
        let emit = |event: ConversionEvent| {
            if let Some(callback) = events {
                callback(&event);
            }
        };

        let candidates: Vec<&Path> = paths
            .iter()
            .map(AsRef::as_ref)
            .filter(|path| !is_blank(path))
            .collect();

        if candidates.is_empty() {
            emit(ConversionEvent::failure(
                EventKind::BatchFailed,
                "No cxr files to convert",
            ));
            return Err(Cxr2XlsxError::NoInputFiles);
        }

        let started_at = Local::now();
        let timer = Instant::now();

        emit(ConversionEvent::info(
            EventKind::BatchStarted,
            "********** Conversion started **********",
        ));

        let mut accumulator = BatchAccumulator::new();
        let mut outputs: Vec<PathBuf> = Vec::new();
        let mut files: Vec<FileOutcome> = Vec::new();
        let total = candidates.len();

        for (index, path) in candidates.iter().enumerate() {
            emit(ConversionEvent::info(
                EventKind::FileStarted,
                format!(
                    "---------- Processing cxr file {} of {}: {} ----------",
                    index + 1,
                    total,
                    path.display()
                ),
            ));

            let (table, sheet_name) = match self.read_table(path) {
                Ok(parsed) => parsed,
                Err(error) => {
                    files.push(FileOutcome::failed(path, &error));

                    if self.on_error == ErrorPolicy::Continue {
                        emit(ConversionEvent::warning(
                            EventKind::FileSkipped,
                            format!("Skipping {}: {}", path.display(), error),
                        ));
                        continue;
                    }

                    emit(ConversionEvent::failure(
                        EventKind::BatchFailed,
                        format!("Conversion failed: {}", error),
                    ));
                    return Err(error);
                }
            };

            emit(ConversionEvent::success(
                EventKind::FileParsed,
                format!(
                    "Read {} variable(s) from {} (sheet '{}')",
                    table.len(),
                    path.display(),
                    sheet_name
                ),
            ));

            if !table.malformed_lines.is_empty() {
                emit(ConversionEvent::warning(
                    EventKind::RecordsMalformed,
                    format!(
                        "{} malformed line(s) written as empty rows: {:?}",
                        table.malformed_lines.len(),
                        table.malformed_lines
                    ),
                ));
            }

            let mut outcome = FileOutcome::parsed(&table, sheet_name.clone());

            if mode == ConversionMode::PerFile {
                let target = self.per_file_output_path(&sheet_name);
                match self.write_workbook(&target, &outputs, &emit, |writer, target| {
                    writer.write_single_sheet(target, &sheet_name, &table.records)
                }) {
                    Ok(written) => {
                        outcome.output = Some(written.clone());
                        outputs.push(written);
                    }
                    Err(error) => {
                        emit(ConversionEvent::failure(
                            EventKind::BatchFailed,
                            format!("Conversion failed: {}", error),
                        ));
                        return Err(error);
                    }
                }
            }

            files.push(outcome);
            accumulator.push(sheet_name, table.into_records());
        }

        if mode == ConversionMode::Combined {
            if accumulator.is_empty() {
                emit(ConversionEvent::warning(
                    EventKind::WorkbookStarted,
                    "No sheets to write; combined workbook skipped",
                ));
            } else {
                let target = self.combined_output_path(started_at);
                let written = self
                    .write_workbook(&target, &outputs, &emit, |writer, target| {
                        writer.write_multi_sheet(
                            target,
                            accumulator.sheet_names(),
                            accumulator.record_lists(),
                        )
                    })
                    .inspect_err(|error| {
                        emit(ConversionEvent::failure(
                            EventKind::BatchFailed,
                            format!("Conversion failed: {}", error),
                        ));
                    })?;
                outputs.push(written);
            }
        }

        let listing = outputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        emit(ConversionEvent::success(
            EventKind::BatchFinished,
            if self.dry_run {
                format!("Dry run complete. Would write:\n{}", listing)
            } else {
                format!("Conversion complete. Output files:\n{}", listing)
            },
        ));

        Ok(ConversionReport {
            mode,
            dry_run: self.dry_run,
            outputs,
            files,
            started_at,
            duration: timer.elapsed(),
        })
    }

    /// Parses one file and derives its sheet name. Empty tables and tables
    /// whose first record has no address are rejected.
    fn read_table(&self, path: &Path) -> Result<(ParsedTable, String)> {
        let table = self.parser.parse(path)?;

        let sheet_name = match table.sheet_name() {
            Some(name) => name,
            None if table.is_empty() => {
                return Err(Cxr2XlsxError::EmptyRecordSet {
                    path: path.display().to_string(),
                })
            }
            None => {
                return Err(Cxr2XlsxError::UnnamedSheet {
                    path: path.display().to_string(),
                    line: table.first_record_line(),
                })
            }
        };

        Ok((table, sheet_name))
    }

    /// Runs one writer call and returns the absolute path of the workbook. In
    /// dry-run mode only the target path is resolved.
    fn write_workbook<F>(
        &self,
        target: &Path,
        previous: &[PathBuf],
        emit: &dyn Fn(ConversionEvent),
        write: F,
    ) -> Result<PathBuf>
    where
        F: FnOnce(&WorkbookWriter, &Path) -> Result<PathBuf>,
    {
        if self.dry_run {
            let planned = std::path::absolute(ensure_xlsx_extension(target))?;
            emit(ConversionEvent::info(
                EventKind::WorkbookWritten,
                format!("Dry run: would write {}", planned.display()),
            ));
            return Ok(planned);
        }

        emit(ConversionEvent::info(
            EventKind::WorkbookStarted,
            "Writing xlsx file...",
        ));

        let written = write(&self.writer, target)?;
        let absolute = std::path::absolute(&written)?;

        if previous.contains(&absolute) {
            emit(ConversionEvent::warning(
                EventKind::WorkbookWritten,
                format!(
                    "Overwrote {} written earlier in this batch",
                    absolute.display()
                ),
            ));
        }

        emit(ConversionEvent::success(
            EventKind::WorkbookWritten,
            format!("Finished writing {}", absolute.display()),
        ));

        Ok(absolute)
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::report::EventLevel;
    use calamine::{open_workbook, Reader, Xlsx};
    use chrono::TimeZone;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    fn write_cxr(dir: &Path, name: &str, addresses: &[&str]) -> PathBuf {
        let mut text = String::from("HEADER\nSYMBOL BEGIN\n");
        for (i, address) in addresses.iter().enumerate() {
            text.push_str(&format!("[{:03}]B\t{}\tSignal {}\t\t{};\n", i, address, i, i));
        }
        text.push_str("SYMBOL END\n");

        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn converter(output: &Path) -> BatchConverter {
        BatchConverter::new(CxrParser::new(), output)
    }

    fn sheet_names(path: &Path) -> Vec<String> {
        let workbook: Xlsx<_> = open_workbook(path).unwrap();
        workbook.sheet_names().to_vec()
    }

    /// Rows spanned by the sheet's `<dimension>`, blank rows included.
    fn row_count(path: &Path, sheet: &str) -> usize {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let dimensions = workbook.worksheet_cells_reader(sheet).unwrap().dimensions();
        dimensions.end.0 as usize + 1
    }

    fn xlsx_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|e| e == "xlsx"))
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_per_file_mode() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let a = write_cxr(input.path(), "a.cxr", &["X0010", "X0011", "X0012"]);

        let report = converter(output.path())
            .convert(&[a], ConversionMode::PerFile, None)
            .unwrap();

        let expected = output.path().join("Variable-Table-X.xlsx");
        assert_eq!(report.outputs.len(), 1);
        assert!(report.outputs[0].is_absolute());
        assert!(report.outputs[0].ends_with("Variable-Table-X.xlsx"));
        assert!(expected.exists());
        assert_eq!(sheet_names(&expected), vec!["X"]);
        assert_eq!(row_count(&expected, "X"), 3);
        assert_eq!(report.files[0].output.as_ref(), Some(&report.outputs[0]));
    }

    #[test]
    fn test_combined_mode() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let a = write_cxr(input.path(), "a.cxr", &["Y0001", "Y0002"]);
        let b = write_cxr(input.path(), "b.cxr", &["0001", "0002", "0003"]);

        let report = converter(output.path())
            .convert(&[a, b], ConversionMode::Combined, None)
            .unwrap();

        let files = xlsx_files(output.path());
        assert_eq!(files.len(), 1);
        assert_eq!(report.outputs.len(), 1);
        assert!(files[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Variable-Table-"));
        assert_eq!(sheet_names(&files[0]), vec!["Y", "IO"]);
        assert_eq!(row_count(&files[0], "IO"), 3);
        assert_eq!(report.total_records(), 5);
    }

    #[test]
    fn test_combined_mode_duplicate_sheet_names() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let a = write_cxr(input.path(), "a.cxr", &["X0001"]);
        let b = write_cxr(input.path(), "b.cxr", &["X0100"]);

        let report = converter(output.path())
            .convert(&[a, b], ConversionMode::Combined, None)
            .unwrap();

        assert_eq!(sheet_names(&report.outputs[0]), vec!["X", "X1"]);
    }

    #[test]
    fn test_blank_paths_are_skipped() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let a = write_cxr(input.path(), "a.cxr", &["M0001"]);

        let paths = vec![PathBuf::from(""), a, PathBuf::from("   ")];
        let report = converter(output.path())
            .convert(&paths, ConversionMode::PerFile, None)
            .unwrap();

        assert_eq!(report.files.len(), 1);
        assert!(output.path().join("Variable-Table-M.xlsx").exists());
    }

    #[test]
    fn test_no_paths() {
        let output = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = vec![PathBuf::from("")];
        let result = converter(output.path()).convert(&paths, ConversionMode::Combined, None);
        assert!(matches!(result, Err(Cxr2XlsxError::NoInputFiles)));
    }

    #[test]
    fn test_empty_record_set_is_reported() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let empty = write_cxr(input.path(), "empty.cxr", &[]);

        let result = converter(output.path()).convert(&[empty], ConversionMode::Combined, None);

        assert!(matches!(result, Err(Cxr2XlsxError::EmptyRecordSet { .. })));
        assert!(xlsx_files(output.path()).is_empty());
    }

    #[test]
    fn test_unnamed_first_record_is_reported() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let path = input.path().join("broken.cxr");
        fs::write(
            &path,
            "HEADER\nSYMBOL BEGIN\n[000]B\tX0001;\n[001]B\tX0002\tLamp\t\t1;\nSYMBOL END\n",
        )
        .unwrap();

        let result = converter(output.path()).convert(&[path], ConversionMode::PerFile, None);

        match result {
            Err(Cxr2XlsxError::UnnamedSheet { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected UnnamedSheet, got {:?}", other),
        }
        assert!(xlsx_files(output.path()).is_empty());
    }

    #[test]
    fn test_malformed_last_line_keeps_its_row() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let path = input.path().join("tail.cxr");
        fs::write(
            &path,
            "HEADER\nSYMBOL BEGIN\n[000]B\tX0001\tLamp\t\t0;\n[001]B\tX0002\tPump\t\t1;\n[002]garbage;\nSYMBOL END\n",
        )
        .unwrap();

        let parsed = CxrParser::new().parse(&path).unwrap();
        assert_eq!(parsed.malformed_lines, vec![5]);

        let report = converter(output.path())
            .convert(&[path], ConversionMode::PerFile, None)
            .unwrap();

        assert_eq!(report.total_records(), parsed.records.len());
        assert_eq!(row_count(&report.outputs[0], "X"), parsed.records.len());
    }

    #[test]
    fn test_abort_keeps_earlier_outputs() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let good = write_cxr(input.path(), "good.cxr", &["X0001"]);
        let bad = input.path().join("bad.cxr");
        fs::write(&bad, "no markers at all\n").unwrap();
        let never = write_cxr(input.path(), "never.cxr", &["Y0001"]);

        let result =
            converter(output.path()).convert(&[good, bad, never], ConversionMode::PerFile, None);

        assert!(matches!(result, Err(Cxr2XlsxError::MissingMarkers { .. })));
        assert!(output.path().join("Variable-Table-X.xlsx").exists());
        assert!(!output.path().join("Variable-Table-Y.xlsx").exists());
    }

    #[test]
    fn test_continue_policy_skips_bad_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let good = write_cxr(input.path(), "good.cxr", &["X0001", "X0002"]);
        let wrong_ext = input.path().join("notes.txt");
        fs::write(&wrong_ext, "SYMBOL\nSYMBOL\n").unwrap();
        let empty = write_cxr(input.path(), "empty.cxr", &[]);

        let report = converter(output.path())
            .with_error_policy(ErrorPolicy::Continue)
            .convert(&[wrong_ext, good, empty], ConversionMode::Combined, None)
            .unwrap();

        assert!(report.has_failures());
        assert_eq!(report.converted_files(), 1);
        let codes: Vec<_> = report.failed_files().map(|f| f.error_code).collect();
        assert_eq!(
            codes,
            vec![Some("E_INVALID_INPUT"), Some("E_EMPTY_RECORD_SET")]
        );
        assert_eq!(sheet_names(&report.outputs[0]), vec!["X"]);
    }

    #[test]
    fn test_continue_policy_with_no_valid_files() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let empty = write_cxr(input.path(), "empty.cxr", &[]);

        let report = converter(output.path())
            .with_error_policy(ErrorPolicy::Continue)
            .convert(&[empty], ConversionMode::Combined, None)
            .unwrap();

        assert!(report.outputs.is_empty());
        assert!(xlsx_files(output.path()).is_empty());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let a = write_cxr(input.path(), "a.cxr", &["X0001"]);

        let report = converter(output.path())
            .with_dry_run(true)
            .convert(&[a], ConversionMode::PerFile, None)
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.outputs.len(), 1);
        assert!(report.outputs[0].ends_with("Variable-Table-X.xlsx"));
        assert!(xlsx_files(output.path()).is_empty());
    }

    #[test]
    fn test_events_are_emitted_in_order() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let a = write_cxr(input.path(), "a.cxr", &["X0001"]);

        let events = RefCell::new(Vec::new());
        let callback = |event: &ConversionEvent| events.borrow_mut().push(event.clone());

        converter(output.path())
            .convert(&[a], ConversionMode::Combined, Some(&callback))
            .unwrap();

        let kinds: Vec<EventKind> = events.borrow().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::BatchStarted,
                EventKind::FileStarted,
                EventKind::FileParsed,
                EventKind::WorkbookStarted,
                EventKind::WorkbookWritten,
                EventKind::BatchFinished,
            ]
        );
        assert!(events.borrow()[0].status_line().starts_with('['));
    }

    #[test]
    fn test_failure_event_is_emitted_once() {
        let output = TempDir::new().unwrap();
        let events = RefCell::new(Vec::new());
        let callback = |event: &ConversionEvent| events.borrow_mut().push(event.clone());

        let result = converter(output.path()).convert(
            &[output.path().join("missing.cxr")],
            ConversionMode::Combined,
            Some(&callback),
        );

        assert!(result.is_err());
        let failures = events
            .borrow()
            .iter()
            .filter(|e| e.level == EventLevel::Failure)
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_output_naming() {
        let converter = converter(Path::new("/out")).with_file_prefix("变量表-");
        let at = Local.with_ymd_and_hms(2021, 7, 4, 13, 45, 9).unwrap();

        assert_eq!(
            converter.combined_output_path(at),
            PathBuf::from("/out/变量表-20210704-134509.xlsx")
        );
        assert_eq!(
            converter.per_file_output_path("IO"),
            PathBuf::from("/out/变量表-IO.xlsx")
        );
    }

    #[test]
    fn test_accumulator() {
        let mut accumulator = BatchAccumulator::new();
        assert!(accumulator.is_empty());

        accumulator.push("X".to_string(), vec![VariableRecord::empty()]);
        accumulator.push("IO".to_string(), vec![]);

        assert_eq!(accumulator.len(), 2);
        assert_eq!(accumulator.sheet_names(), ["X", "IO"]);
        assert_eq!(accumulator.record_lists()[0].len(), 1);
    }
}
