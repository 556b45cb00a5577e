//! Untyped tables as handed over by the loading layer.

use std::borrow::Cow;

use crate::columns::{find_header_row, HEADER_SCAN_LIMIT};

/// One scalar as read from a source sheet or CSV file.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    /// Spreadsheet numerics, including date serials.
    Number(f64),
}

impl RawCell {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Stringified cell. Integral numbers lose their `.0` so an order id
    /// stored as `1230.0` reads `1230`.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Cow::Owned(format!("{}", *n as i64))
            }
            Self::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for RawCell {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<f64> for RawCell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Header row plus data rows. Rows may be ragged; missing trailing cells
/// read as [`RawCell::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

static EMPTY_CELL: RawCell = RawCell::Empty;

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Self { headers, rows }
    }

    /// Use the first grid row as the header row.
    pub fn from_first_row(mut grid: Vec<Vec<RawCell>>) -> Self {
        if grid.is_empty() {
            return Self::default();
        }
        let header = grid.remove(0);
        Self::with_header(header, grid)
    }

    /// Locate the header row inside a header-less grid (title rows, blank
    /// lines and notes above it are skipped). Returns `None` when no row in
    /// the scanned prefix carries every label.
    pub fn from_grid(mut grid: Vec<Vec<RawCell>>, header_labels: &[String]) -> Option<Self> {
        let idx = find_header_row(&grid, header_labels, HEADER_SCAN_LIMIT)?;
        let mut data = grid.split_off(idx);
        let header = data.remove(0);
        Some(Self::with_header(header, data))
    }

    fn with_header(header: Vec<RawCell>, rows: Vec<Vec<RawCell>>) -> Self {
        let headers = header
            .iter()
            .map(|c| c.as_text().trim().to_string())
            .collect();
        let rows = rows
            .into_iter()
            .filter(|r| !r.iter().all(RawCell::is_blank))
            .collect();
        Self { headers, rows }
    }

    /// Widest of the header row and every data row.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.headers.len())
    }

    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}
