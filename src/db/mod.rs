use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::AppResult;
use crate::inventory::HERB_NAME;
use crate::models::{normalize_key, Cell, Table};

/// Storage handle for named sheets. Callers load a full snapshot, edit it in
/// memory and save it back whole.
pub trait SheetStore: Send {
    /// `Ok(None)` when no sheet with that name exists.
    fn load(&self, sheet: &str) -> AppResult<Option<Table>>;

    fn save(&mut self, sheet: &str, table: &Table) -> AppResult<()>;
}

// ── CSV files ─────────────────────────────────────────────────────────────────

/// One `<sheet>.csv` per sheet inside `dir`; the first record is the header.
#[derive(Debug, Clone)]
pub struct CsvSheetStore {
    dir: PathBuf,
}

impl CsvSheetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet))
    }

    /// Creates the sheet with `header` if it is missing. Returns whether a new
    /// file was written.
    pub fn ensure_sheet(&mut self, sheet: &str, header: &[&str]) -> AppResult<bool> {
        if self.path_for(sheet).exists() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)?;
        let table = Table::new(header.iter().map(|h| h.to_string()).collect());
        self.save(sheet, &table)?;
        info!(sheet, path = %self.path_for(sheet).display(), "Created empty sheet");
        Ok(true)
    }
}

fn read_table(path: &Path) -> AppResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let header: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
        None => Vec::new(),
    };

    // Herb names stay text: a herb called "true" must not turn into a flag.
    let herb_col = header
        .iter()
        .position(|h| normalize_key(h) == normalize_key(HERB_NAME));

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(
            record
                .iter()
                .enumerate()
                .map(|(col, raw)| {
                    if Some(col) == herb_col {
                        Cell::text(raw)
                    } else {
                        Cell::parse(raw)
                    }
                })
                .collect(),
        );
    }

    Ok(Table::with_rows(header, rows))
}

impl SheetStore for CsvSheetStore {
    fn load(&self, sheet: &str) -> AppResult<Option<Table>> {
        let path = self.path_for(sheet);
        if !path.exists() {
            return Ok(None);
        }
        let table = read_table(&path)?;
        debug!(sheet, rows = table.len(), "Loaded sheet");
        Ok(Some(table))
    }

    fn save(&mut self, sheet: &str, table: &Table) -> AppResult<()> {
        let path = self.path_for(sheet);
        let tmp = path.with_extension("csv.tmp");

        {
            let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;
            writer.write_record(table.header())?;
            for row in table.rows() {
                writer.write_record(row.iter().map(Cell::to_field))?;
            }
            writer.flush()?;
        }
        // Rename so a concurrent reader never sees a half-written sheet.
        fs::rename(&tmp, &path)?;

        debug!(sheet, rows = table.len(), "Saved sheet");
        Ok(())
    }
}

// ── In memory ─────────────────────────────────────────────────────────────────

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySheetStore {
    pub sheets: std::collections::HashMap<String, Table>,
}

#[cfg(test)]
impl MemorySheetStore {
    pub fn with_sheet(name: &str, table: Table) -> Self {
        let mut store = Self::default();
        store.sheets.insert(name.to_string(), table);
        store
    }
}

#[cfg(test)]
impl SheetStore for MemorySheetStore {
    fn load(&self, sheet: &str) -> AppResult<Option<Table>> {
        Ok(self.sheets.get(sheet).cloned())
    }

    fn save(&mut self, sheet: &str, table: &Table) -> AppResult<()> {
        self.sheets.insert(sheet.to_string(), table.clone());
        Ok(())
    }
}
