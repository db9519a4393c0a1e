use std::borrow::Cow;
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single spreadsheet cell as handed over by the reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

/// Marker written into canonical cells that have no source value.
pub const MISSING: Cell = Cell::Empty;

impl Cell {
    /// Build a cell from raw text; blank text is empty.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) | Cell::Date(_) => false,
        }
    }

    /// Display form used for header labels and key comparison.
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_number(*n),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Integers without decimals, everything else as-is.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

// ---------------------------------------------------------------------------
// Raw table
// ---------------------------------------------------------------------------

/// Rows exactly as read from the source. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Parse CSV text without interpreting any row as a header.
    pub fn from_csv_str(content: &str, delimiter: u8) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| ReconError::Csv(format!("line {}: {e}", row_idx + 1)))?;
            rows.push(record.iter().map(Cell::text).collect());
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Source accessor
// ---------------------------------------------------------------------------

/// Yields the source re-tabulated with its header at a given row.
///
/// Readers that must re-parse the file per offset return owned rows;
/// in-memory tables borrow.
pub trait TableSource {
    fn row_count(&self) -> usize;

    /// `None` when `offset` is past the last row.
    fn view_at(&self, offset: usize) -> Option<TableView<'_>>;
}

impl TableSource for RawTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn view_at(&self, offset: usize) -> Option<TableView<'_>> {
        if offset >= self.rows.len() {
            return None;
        }
        Some(TableView {
            offset,
            rows: Cow::Borrowed(&self.rows[offset..]),
        })
    }
}

/// The source seen from one candidate header row downwards.
#[derive(Debug, Clone)]
pub struct TableView<'a> {
    pub offset: usize,
    rows: Cow<'a, [Vec<Cell>]>,
}

/// Prefix given to header cells that are empty.
pub const UNNAMED_PREFIX: &str = "Unnamed: ";

impl TableView<'static> {
    pub fn owned(offset: usize, rows: Vec<Vec<Cell>>) -> Self {
        TableView {
            offset,
            rows: Cow::Owned(rows),
        }
    }
}

impl TableView<'_> {
    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn body(&self) -> &[Vec<Cell>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    /// Widest row in the view, header included.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// One label per column. Empty header cells become `Unnamed: <i>`,
    /// repeated labels get `.1`, `.2`, ... in order of appearance.
    pub fn header_labels(&self) -> Vec<String> {
        let header = self.header();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut labels = Vec::with_capacity(self.column_count());

        for col in 0..self.column_count() {
            let base = match header.get(col) {
                Some(cell) if !cell.is_empty() => cell.display(),
                _ => format!("{UNNAMED_PREFIX}{col}"),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let label = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            labels.push(label);
        }
        labels
    }

    /// Labels of columns whose header cell is not empty.
    pub fn named_labels(&self) -> Vec<String> {
        let header = self.header();
        self.header_labels()
            .into_iter()
            .enumerate()
            .filter(|(col, _)| header.get(*col).is_some_and(|c| !c.is_empty()))
            .map(|(_, label)| label)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    #[test]
    fn blank_text_is_empty() {
        assert_eq!(Cell::text("   "), Cell::Empty);
        assert!(Cell::Text(" ".into()).is_empty());
        assert!(!Cell::Number(0.0).is_empty());
    }

    #[test]
    fn number_display_drops_integral_decimals() {
        assert_eq!(Cell::Number(42.0).display(), "42");
        assert_eq!(Cell::Number(42.5).display(), "42.5");
        assert_eq!(
            Cell::Date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()).display(),
            "2024-04-01"
        );
    }

    #[test]
    fn csv_rows_are_ragged() {
        let table = RawTable::from_csv_str("Report,,\nA,B,C,D\n1,2\n", b',').unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0], vec![t("Report"), Cell::Empty, Cell::Empty]);
        assert_eq!(table.rows()[1].len(), 4);
        assert_eq!(table.rows()[2].len(), 2);
    }

    #[test]
    fn view_past_end_is_none() {
        let table = RawTable::from_csv_str("a,b\n", b',').unwrap();
        assert!(table.view_at(0).is_some());
        assert!(table.view_at(1).is_none());
        assert!(RawTable::default().view_at(0).is_none());
    }

    #[test]
    fn header_labels_fill_and_dedupe() {
        let table = RawTable::new(vec![
            vec![t(" Amount "), Cell::Empty, t("Amount"), Cell::Number(2024.0)],
            vec![t("1"), t("2"), t("3"), t("4"), t("5")],
        ]);
        let view = table.view_at(0).unwrap();
        assert_eq!(view.column_count(), 5);
        assert_eq!(
            view.header_labels(),
            vec!["Amount", "Unnamed: 1", "Amount.1", "2024", "Unnamed: 4"]
        );
        assert_eq!(view.named_labels(), vec!["Amount", "Amount.1", "2024"]);
    }

    #[test]
    fn view_splits_header_and_body() {
        let table = RawTable::from_csv_str("title\nh1,h2\nv1,v2\n", b',').unwrap();
        let view = table.view_at(1).unwrap();
        assert_eq!(view.offset, 1);
        assert_eq!(view.header(), &[t("h1"), t("h2")]);
        assert_eq!(view.body().len(), 1);
    }
}
