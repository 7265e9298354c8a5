pub mod input_scanner;

pub use input_scanner::{parse_path_list, InputScanner};
