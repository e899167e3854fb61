use serde::Serialize;
use std::fmt;

/// A single spreadsheet cell as read from the upload
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Integer view of the cell: ints, whole floats and numeric text
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) => whole_float(*f),
            CellValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_float))
            }
            CellValue::Empty | CellValue::Bool(_) => None,
        }
    }

    /// Text view of a non-blank cell, numbers rendered without a trailing `.0`
    ///
    /// Text is returned verbatim, surrounding whitespace included; cells that
    /// are empty or whitespace-only give `None`.
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

fn whole_float(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => match whole_float(*v) {
                Some(i) => write!(f, "{}", i),
                None => write!(f, "{}", v),
            },
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// One named sheet: a header row plus the data rows beneath it
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// 1-based spreadsheet row holding the header; data follows directly below
    pub header_row: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Table {
            name: name.into(),
            columns,
            rows,
            header_row: 1,
        }
    }

    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }

    /// 1-based spreadsheet row of the data row at `idx`
    pub fn sheet_row(&self, idx: usize) -> usize {
        self.header_row + idx + 1
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Every sheet of one upload, in workbook order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    tables: Vec<Table>,
}

impl Workbook {
    pub fn new(tables: Vec<Table>) -> Self {
        Workbook { tables }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_view_accepts_whole_numbers_only() {
        assert_eq!(CellValue::Int(7).as_i64(), Some(7));
        assert_eq!(CellValue::Float(2024.0).as_i64(), Some(2024));
        assert_eq!(CellValue::Float(2.5).as_i64(), None);
        assert_eq!(CellValue::Text(" 12 ".into()).as_i64(), Some(12));
        assert_eq!(CellValue::Text("12.0".into()).as_i64(), Some(12));
        assert_eq!(CellValue::Text("twelve".into()).as_i64(), None);
        assert_eq!(CellValue::Empty.as_i64(), None);
    }

    #[test]
    fn text_view_keeps_whitespace_and_drops_trailing_zero_fraction() {
        assert_eq!(CellValue::Float(42.0).as_text(), Some("42".to_string()));
        assert_eq!(CellValue::Text("  A ".into()).as_text(), Some("  A ".to_string()));
        assert_eq!(CellValue::Text("   ".into()).as_text(), None);
        assert_eq!(CellValue::Empty.as_text(), None);
    }

    #[test]
    fn sheet_rows_count_from_the_header() {
        let table = Table::new("t", vec!["a".into()], Vec::new());
        assert_eq!(table.sheet_row(0), 2);
        assert_eq!(table.with_header_row(3).sheet_row(1), 5);
    }
}
