use chrono::NaiveDate;

/// One spreadsheet cell. Booleans and dates are typed; anything else is text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Date(NaiveDate),
    Text(String),
}

static EMPTY: Cell = Cell::Empty;

/// Text date layouts accepted when a date column was typed by hand.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

impl Cell {
    /// Interpret a raw field the way a spreadsheet would on import.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return Cell::Date(date);
        }
        Cell::Text(raw.to_string())
    }

    /// Keeps the field as text even if it looks like a boolean or a date.
    pub fn text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    /// Inverse of [`Cell::parse`].
    pub fn to_field(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Bool(true) => "TRUE".to_string(),
            Cell::Bool(false) => "FALSE".to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Only a real boolean `true` counts as a set flag.
    pub fn is_true(&self) -> bool {
        matches!(self, Cell::Bool(true))
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s.trim(), fmt).ok()),
            _ => None,
        }
    }
}

/// Comparison key for herb names and column names.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A sheet: header row plus data rows. Data row indices are 0-based and do
/// not count the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Self { header, rows: Vec::new() }
    }

    pub fn with_rows(header: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { header, rows }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Column index by name, ignoring case and surrounding whitespace.
    pub fn column(&self, name: &str) -> Option<usize> {
        let key = normalize_key(name);
        self.header.iter().position(|h| normalize_key(h) == key)
    }

    /// First data row whose `key_col` text matches `name`. Duplicates are not
    /// detected; the earliest row wins.
    pub fn find_row(&self, key_col: usize, name: &str) -> Option<usize> {
        let key = normalize_key(name);
        self.rows.iter().position(|row| {
            row.get(key_col)
                .map(|cell| normalize_key(&cell.to_field()) == key)
                .unwrap_or(false)
        })
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Writes one cell, padding short rows with empties.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) {
        let width = self.header.len().max(col + 1);
        let cells = &mut self.rows[row];
        if cells.len() < width {
            cells.resize(width, Cell::Empty);
        }
        cells[col] = value;
    }

    /// Appends an empty row and returns its index.
    pub fn push_row(&mut self) -> usize {
        self.rows.push(vec![Cell::Empty; self.header.len()]);
        self.rows.len() - 1
    }
}
