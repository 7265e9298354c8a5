use serde::{Deserialize, Serialize};

/// Number of tab-separated fields on a well-formed record line.
pub const RECORD_FIELD_COUNT: usize = 5;

/// Sheet name used when an address does not start with a letter.
pub const IO_SHEET_NAME: &str = "IO";

/// One row of a cxr variable table.
///
/// The source line carries five fields; the fourth is an extra comment column
/// that is not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub var_type: String,
    pub address: String,
    pub name: String,
    pub value: String,
}

impl VariableRecord {
    pub fn new<S: Into<String>>(var_type: S, address: S, name: S, value: S) -> Self {
        Self {
            var_type: var_type.into(),
            address: address.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    /// The all-empty record substituted for malformed lines.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a record from exactly five fields, keeping fields 0, 1, 2 and 4.
    /// Returns `None` for any other field count.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        match fields {
            [var_type, address, name, _comment, value] => Some(Self::new(
                var_type.as_ref(),
                address.as_ref(),
                name.as_ref(),
                value.as_ref(),
            )),
            _ => None,
        }
    }

    /// Lenient conversion: malformed field lists degrade to `VariableRecord::empty()`.
    pub fn from_fields_lenient<S: AsRef<str>>(fields: &[S]) -> Self {
        Self::from_fields(fields).unwrap_or_default()
    }

    /// The `(type, address, name, value)` row written to a sheet.
    pub fn to_row(&self) -> [&str; 4] {
        [&self.var_type, &self.address, &self.name, &self.value]
    }

    pub fn is_empty(&self) -> bool {
        self.var_type.is_empty()
            && self.address.is_empty()
            && self.name.is_empty()
            && self.value.is_empty()
    }

    pub fn sheet_name(&self) -> String {
        sheet_name_for(&self.address)
    }
}

/// Derives a sheet name from a variable address: the leading character when it
/// is alphabetic (`"X0001"` -> `"X"`), otherwise `"IO"`.
pub fn sheet_name_for(address: &str) -> String {
    match address.chars().next() {
        Some(first) if first.is_alphabetic() => first.to_string(),
        _ => IO_SHEET_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fields_drops_comment_column() {
        let record = VariableRecord::from_fields(&["B", "X0001", "Start", "extra", "0"]).unwrap();
        assert_eq!(record.to_row(), ["B", "X0001", "Start", "0"]);
    }

    #[test]
    fn test_wrong_field_count() {
        assert!(VariableRecord::from_fields(&["B", "X0001", "Start", "0"]).is_none());
        assert!(VariableRecord::from_fields(&["a", "b", "c", "d", "e", "f"]).is_none());
        assert!(VariableRecord::from_fields::<&str>(&[]).is_none());

        let record = VariableRecord::from_fields_lenient(&[""]);
        assert!(record.is_empty());
        assert_eq!(record.to_row(), ["", "", "", ""]);
    }

    #[test]
    fn test_sheet_name_for() {
        assert_eq!(sheet_name_for("X0001"), "X");
        assert_eq!(sheet_name_for("m12"), "m");
        assert_eq!(sheet_name_for("0001"), "IO");
        assert_eq!(sheet_name_for("%IX0.0"), "IO");
        assert_eq!(sheet_name_for("变量"), "变");
        assert_eq!(sheet_name_for(""), "IO");
    }

    #[test]
    fn test_record_sheet_name() {
        let record = VariableRecord::new("W", "D100", "Speed", "1500");
        assert_eq!(record.sheet_name(), "D");
        assert!(!record.is_empty());
    }
}
