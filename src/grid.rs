use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single spreadsheet cell as handed over by the loader.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Text rendering of the cell, trimmed. Integral numbers lose their
    /// fractional part so item codes stored as numbers read as `"1001"`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
        }
    }

    /// Native numeric value only; text is never parsed here.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// One sheet of a workbook, row-major. Rows may be ragged; reads past the end
/// of a row return an empty cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetGrid {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl SpreadsheetGrid {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Builds a grid from plain strings, treating numeric-looking text as a
    /// number the way a spreadsheet loader would.
    pub fn from_text_rows<R, S>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|raw| {
                        let raw = raw.as_ref().trim();
                        if raw.is_empty() {
                            Cell::Empty
                        } else if let Ok(n) = raw.parse::<f64>() {
                            Cell::Number(n)
                        } else {
                            Cell::Text(raw.to_string())
                        }
                    })
                    .collect()
            })
            .collect();

        Self::new(name, rows)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.row(row).get(col).unwrap_or(&EMPTY_CELL)
    }

    /// Lowercased, space-joined text of every non-blank cell in the row.
    pub fn row_text(&self, row: usize) -> String {
        self.row(row)
            .iter()
            .filter(|c| !c.is_blank())
            .map(|c| c.as_text().to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn non_blank_count(&self, row: usize) -> usize {
        self.row(row).iter().filter(|c| !c.is_blank()).count()
    }

    pub fn is_blank_row(&self, row: usize) -> bool {
        self.non_blank_count(row) == 0
    }

    pub fn is_blank(&self) -> bool {
        (0..self.height()).all(|r| self.is_blank_row(r))
    }

    pub fn full_range(&self) -> RecordRange {
        RecordRange::new(0, self.height())
    }
}

/// Half-open row interval `[start, end)` attributed to one logical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRange {
    pub start: usize,
    pub end: usize,
}

impl RecordRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.start && row < self.end
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<SpreadsheetGrid>,
}

impl Workbook {
    pub fn new(sheets: Vec<SpreadsheetGrid>) -> Self {
        Self { sheets }
    }

    /// True when there is nothing at all to read: no sheets, or only blank ones.
    pub fn is_unreadable(&self) -> bool {
        self.sheets.iter().all(SpreadsheetGrid::is_blank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(Cell::Number(1001.0).as_text(), "1001");
        assert_eq!(Cell::Number(2.5).as_text(), "2.5");
        assert_eq!(Cell::Text("  Salt ".into()).as_text(), "Salt");
        assert_eq!(Cell::Empty.as_text(), "");
    }

    #[test]
    fn test_ragged_rows_read_as_empty() {
        let grid = SpreadsheetGrid::from_text_rows("Sheet1", vec![vec!["a", "b"], vec!["c"]]);
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.cell(1, 1), &Cell::Empty);
        assert_eq!(grid.cell(10, 0), &Cell::Empty);
        assert!(grid.row(10).is_empty());
    }

    #[test]
    fn test_from_text_rows_detects_numbers() {
        let grid = SpreadsheetGrid::from_text_rows("Sheet1", vec![vec!["Flour", "2.5", ""]]);
        assert_eq!(grid.cell(0, 0), &Cell::Text("Flour".into()));
        assert_eq!(grid.cell(0, 1), &Cell::Number(2.5));
        assert_eq!(grid.cell(0, 2), &Cell::Empty);
    }

    #[test]
    fn test_row_text_and_blank_detection() {
        let grid = SpreadsheetGrid::new(
            "Sheet1",
            vec![
                vec![Cell::from("Item Code"), Cell::Empty, Cell::from("NAME")],
                vec![Cell::from("   "), Cell::Empty],
            ],
        );
        assert_eq!(grid.row_text(0), "item code name");
        assert!(grid.is_blank_row(1));
        assert!(!grid.is_blank());
    }

    #[test]
    fn test_cell_deserializes_untagged() {
        let row: Vec<Cell> = serde_json::from_str(r#"[null, 3.5, "Beef", true]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Cell::Empty,
                Cell::Number(3.5),
                Cell::Text("Beef".into()),
                Cell::Bool(true)
            ]
        );
    }

    #[test]
    fn test_workbook_unreadable() {
        assert!(Workbook::default().is_unreadable());
        let blank = SpreadsheetGrid::new("Blank", vec![vec![Cell::Empty]]);
        assert!(Workbook::new(vec![blank]).is_unreadable());
    }
}
