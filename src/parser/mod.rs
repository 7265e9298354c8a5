pub mod cxr_parser;
pub mod record;

pub use cxr_parser::{CxrParser, Framing, ParsedTable, RecordPolicy, TextEncoding};
pub use record::{sheet_name_for, VariableRecord};
