// src/dataset.rs
use crate::error::{AuditError, Result};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Rendering used whenever a datetime cell is turned back into text
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell value. Every cell is text, missing, or an already-parsed datetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    DateTime(NaiveDateTime),
    Missing,
}

impl Cell {
    /// Build a cell from raw text; empty text is missing
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Text view of the cell (datetimes are rendered, missing is None)
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::DateTime(dt) => Some(dt.format(DATETIME_FORMAT).to_string()),
            Cell::Missing => None,
        }
    }

    /// Borrowed text, only for text cells
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Datetime view: datetime cells directly, text cells parsed with `pattern`.
    /// Unparseable text yields None.
    pub fn as_datetime(&self, pattern: &str) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => NaiveDateTime::parse_from_str(s, pattern).ok(),
            Cell::Missing => None,
        }
    }

    /// Serialized form used in artifacts
    pub fn render(&self) -> String {
        self.as_text().unwrap_or_default()
    }
}

/// Ordered rows sharing a fixed, ordered set of named columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: IndexMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Build a dataset from a header and rows.
    /// Rows are padded or truncated to the header width. A repeated column
    /// name gets a `.1`, `.2`, ... suffix so every cell keeps its own column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut unique: IndexMap<String, usize> = IndexMap::with_capacity(columns.len());
        let mut suffixes: HashMap<String, usize> = HashMap::new();
        for name in columns {
            let mut candidate = name.clone();
            while unique.contains_key(&candidate) {
                let count = suffixes.entry(name.clone()).or_insert(0);
                *count += 1;
                candidate = format!("{}.{}", name, count);
            }
            let index = unique.len();
            unique.insert(candidate, index);
        }
        let columns = unique;
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Missing);
                row
            })
            .collect();
        Dataset { columns, rows }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Position of a column required by exact name
    pub fn require(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| AuditError::MissingRequiredColumn(name.to_string()))
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |cells| Record {
            columns: &self.columns,
            cells,
        })
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// New dataset keeping only the records for which `keep` returns true
    pub fn retain<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Record<'_>) -> bool,
    {
        let rows = self
            .records()
            .filter(|r| keep(r))
            .map(|r| r.cells.to_vec())
            .collect();
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// New dataset where `name` is set to the value computed per record.
    /// An existing column is replaced in place; a new one is appended.
    pub fn with_column<F>(&self, name: &str, mut compute: F) -> Dataset
    where
        F: FnMut(&Record<'_>) -> Cell,
    {
        let mut columns = self.columns.clone();
        let next = columns.len();
        let index = *columns.entry(name.to_string()).or_insert(next);

        let rows = self
            .records()
            .map(|r| {
                let value = compute(&r);
                let mut cells = r.cells.to_vec();
                if index < cells.len() {
                    cells[index] = value;
                } else {
                    cells.push(value);
                }
                cells
            })
            .collect();

        Dataset { columns, rows }
    }
}

static MISSING: Cell = Cell::Missing;

/// Borrowed view of one row with name-based accessors
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a IndexMap<String, usize>,
    cells: &'a [Cell],
}

impl<'a> Record<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        self.columns.get(column).and_then(|&i| self.cells.get(i))
    }

    pub fn at(&self, index: usize) -> &'a Cell {
        self.cells.get(index).unwrap_or(&MISSING)
    }

    /// Text of the cell at `index`, None when missing
    pub fn text_at(&self, index: usize) -> Option<String> {
        self.at(index).as_text()
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["Nome".to_string(), "Cidade".to_string()],
            vec![
                vec![Cell::from_raw("Ana"), Cell::from_raw("Recife")],
                vec![Cell::from_raw("Bruno")],
            ],
        )
    }

    #[test]
    fn test_short_rows_are_padded() {
        let ds = sample();
        assert_eq!(ds.len(), 2);
        let second = ds.records().nth(1).unwrap();
        assert!(second.get("Cidade").unwrap().is_missing());
    }

    #[test]
    fn test_with_column_appends_then_replaces() {
        let ds = sample();
        let added = ds.with_column("Flag", |_| Cell::from_raw("x"));
        assert_eq!(added.column_names(), vec!["Nome", "Cidade", "Flag"]);

        let replaced = added.with_column("Nome", |_| Cell::Missing);
        assert_eq!(replaced.column_count(), 3);
        assert!(replaced.records().all(|r| r.get("Nome").unwrap().is_missing()));
        // input untouched
        assert_eq!(ds.column_count(), 2);
    }

    #[test]
    fn test_datetime_accessor() {
        let cell = Cell::from_raw("01/02/2024 08:30:00");
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(cell.as_datetime("%d/%m/%Y %H:%M:%S"), Some(expected));
        assert_eq!(Cell::from_raw("ontem").as_datetime("%d/%m/%Y %H:%M:%S"), None);
        assert_eq!(Cell::DateTime(expected).render(), "2024-02-01 08:30:00");
    }

    #[test]
    fn test_duplicate_columns_keep_their_cells() {
        let ds = Dataset::new(
            vec!["Nome".to_string(), "Nome".to_string(), "Nome".to_string()],
            vec![vec![
                Cell::from_raw("a"),
                Cell::from_raw("b"),
                Cell::from_raw("c"),
            ]],
        );
        assert_eq!(ds.column_names(), vec!["Nome", "Nome.1", "Nome.2"]);
        let record = ds.records().next().unwrap();
        assert_eq!(record.get("Nome.1").unwrap().as_str(), Some("b"));
        assert_eq!(record.get("Nome.2").unwrap().as_str(), Some("c"));
    }

    #[test]
    fn test_require_reports_missing_column() {
        let err = sample().require("Recebimento de O.S").unwrap_err();
        assert!(matches!(err, AuditError::MissingRequiredColumn(c) if c == "Recebimento de O.S"));
    }
}
