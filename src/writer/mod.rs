pub mod workbook_writer;

pub use workbook_writer::{ensure_xlsx_extension, unique_sheet_names, WorkbookWriter};
