use crate::error::{Cxr2XlsxError, Result};
use crate::parser::VariableRecord;
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const XLSX_EXTENSION: &str = "xlsx";

/// Writes variable records into xlsx workbooks, one row per record and no header row.
pub struct WorkbookWriter {
    deduplicate_sheet_names: bool,
}

impl WorkbookWriter {
    pub fn new() -> Self {
        Self {
            deduplicate_sheet_names: true,
        }
    }

    /// When enabled, repeated sheet names get numeric suffixes (`X`, `X1`, `X2`)
    /// instead of failing the save.
    pub fn with_deduplicated_sheet_names(mut self, enabled: bool) -> Self {
        self.deduplicate_sheet_names = enabled;
        self
    }

    /// Writes a workbook holding a single sheet. Returns the path actually
    /// written, which always ends in `.xlsx`. Existing files are overwritten.
    pub fn write_single_sheet(
        &self,
        output_path: &Path,
        sheet_name: &str,
        records: &[VariableRecord],
    ) -> Result<PathBuf> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        fill_worksheet(worksheet, sheet_name, records)?;

        self.save(&mut workbook, output_path)
    }

    /// Writes one sheet per `(sheet_name, records)` pair, in order. Nothing is
    /// written when the two lists differ in length.
    pub fn write_multi_sheet<S, R>(
        &self,
        output_path: &Path,
        sheet_names: &[S],
        record_lists: &[R],
    ) -> Result<PathBuf>
    where
        S: AsRef<str>,
        R: AsRef<[VariableRecord]>,
    {
        if sheet_names.len() != record_lists.len() {
            return Err(Cxr2XlsxError::SheetCountMismatch {
                sheets: sheet_names.len(),
                record_sets: record_lists.len(),
            });
        }

        let names: Vec<String> = if self.deduplicate_sheet_names {
            unique_sheet_names(sheet_names)
        } else {
            sheet_names.iter().map(|n| n.as_ref().to_string()).collect()
        };

        let mut workbook = Workbook::new();
        for (name, records) in names.iter().zip(record_lists) {
            let worksheet = workbook.add_worksheet();
            fill_worksheet(worksheet, name, records.as_ref())?;
        }

        self.save(&mut workbook, output_path)
    }

    fn save(&self, workbook: &mut Workbook, output_path: &Path) -> Result<PathBuf> {
        let path = ensure_xlsx_extension(output_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        workbook.save(&path)?;
        Ok(path)
    }
}

impl Default for WorkbookWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_worksheet(
    worksheet: &mut Worksheet,
    sheet_name: &str,
    records: &[VariableRecord],
) -> Result<()> {
    worksheet.set_name(sheet_name)?;

    // A blank cell only reaches the file when it carries a non-default format.
    let empty_row = Format::new().set_num_format("@");

    for (index, record) in records.iter().enumerate() {
        let row = RowNum::try_from(index).map_err(|_| Cxr2XlsxError::ConversionFailed {
            message: format!("Too many records for sheet '{}'", sheet_name),
        })?;

        // Every record owns a row.
        if record.is_empty() {
            worksheet.write_blank(row, 0, &empty_row)?;
            continue;
        }

        for (col, cell) in record.to_row().iter().enumerate() {
            // Blank fields stay as empty cells.
            if cell.is_empty() {
                continue;
            }
            worksheet.write_string(row, col as ColNum, *cell)?;
        }
    }

    Ok(())
}

/// Appends `.xlsx` unless the path already ends with it.
pub fn ensure_xlsx_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == XLSX_EXTENSION) {
        return path.to_path_buf();
    }

    let mut with_extension = path.as_os_str().to_owned();
    with_extension.push(".");
    with_extension.push(XLSX_EXTENSION);
    PathBuf::from(with_extension)
}

/// Makes sheet names unique, ignoring case, by appending the smallest free
/// numeric suffix to repeats.
pub fn unique_sheet_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(names.len());

    for name in names {
        let base = name.as_ref();
        let mut candidate = base.to_string();
        let mut suffix = 1;

        while taken.contains(&candidate.to_lowercase()) {
            candidate = format!("{}{}", base, suffix);
            suffix += 1;
        }

        taken.insert(candidate.to_lowercase());
        unique.push(candidate);
    }

    unique
}
