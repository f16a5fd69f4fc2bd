//! Row-level operations on the inventory sheet: mark, clear and query a
//! status flag for a batch of herbs.

use chrono::{Duration, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::{normalize_key, Cell, Table};

pub const HERB_NAME: &str = "Herb Name";
pub const DATE_STARTED: &str = "Date Started";
pub const DATE_READY: &str = "Date Ready";

/// The only status with start/ready date side effects.
pub const IN_PROCESS_STATUS: &str = "In Tincture";

/// Header written when the sheet is first created.
pub const DEFAULT_HEADER: &[&str] = &[
    HERB_NAME,
    "Low",
    "Out",
    IN_PROCESS_STATUS,
    "Clinic Backstock",
    DATE_STARTED,
    DATE_READY,
];

const STRUCTURAL_COLUMNS: &[&str] = &[HERB_NAME, DATE_STARTED, DATE_READY];

/// Dates stamped onto a row when a tincture is started.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub today: NaiveDate,
    pub steep_days: i64,
}

impl Schedule {
    pub fn new(today: NaiveDate, steep_days: i64) -> Self {
        Self { today, steep_days }
    }

    pub fn ready_on(&self) -> NaiveDate {
        self.today + Duration::days(self.steep_days)
    }
}

/// Result of one operation: human-readable lines plus the `data` payload.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub message: String,
    pub data: serde_json::Value,
}

/// Per-herb detail reported by a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbStatus {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_ready: Option<NaiveDate>,
}

impl HerbStatus {
    fn not_found() -> Self {
        Self {
            found: false,
            status: None,
            value: None,
            statuses: None,
            date_ready: None,
        }
    }
}

/// One row of the read-only inventory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HerbSummary {
    pub herb: String,
    pub statuses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_started: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_ready: Option<NaiveDate>,
}

// ── Column helpers ────────────────────────────────────────────────────────────

/// Every non-structural, non-blank header column is a boolean status flag.
pub fn status_columns(table: &Table) -> Vec<usize> {
    table
        .header()
        .iter()
        .enumerate()
        .filter(|(_, name)| {
            let key = normalize_key(name);
            !key.is_empty() && !STRUCTURAL_COLUMNS.iter().any(|s| normalize_key(s) == key)
        })
        .map(|(idx, _)| idx)
        .collect()
}

fn herb_column(table: &Table) -> AppResult<usize> {
    table
        .column(HERB_NAME)
        .ok_or_else(|| AppError::missing_column(HERB_NAME))
}

/// Resolves a status column, returning its index and header spelling.
/// Structural columns never count as statuses.
fn status_column(table: &Table, status: &str) -> AppResult<(usize, String)> {
    let idx = table
        .column(status)
        .filter(|idx| status_columns(table).contains(idx))
        .ok_or_else(|| AppError::missing_status(status))?;
    Ok((idx, table.header()[idx].trim().to_string()))
}

fn is_in_process(status: &str) -> bool {
    normalize_key(status) == normalize_key(IN_PROCESS_STATUS)
}

fn true_statuses(table: &Table, row: usize, columns: &[usize]) -> Vec<String> {
    columns
        .iter()
        .filter(|&&col| table.cell(row, col).is_true())
        .map(|&col| table.header()[col].trim().to_string())
        .collect()
}

// ── Mark ──────────────────────────────────────────────────────────────────────

/// Sets `status` on every herb, creating rows for herbs not yet listed.
pub fn mark_status(
    table: &mut Table,
    herbs: &[String],
    status: &str,
    schedule: &Schedule,
) -> AppResult<Outcome> {
    let herb_col = herb_column(table)?;
    let (status_col, status_name) = status_column(table, status)?;
    let in_process = is_in_process(&status_name);
    let started_col = table.column(DATE_STARTED);
    let ready_col = table.column(DATE_READY);
    let flags = status_columns(table);

    let mut lines = Vec::with_capacity(herbs.len());

    for herb in herbs {
        let name = herb.trim();
        let (row, created) = match table.find_row(herb_col, name) {
            Some(row) => (row, false),
            None => {
                let row = table.push_row();
                table.set_cell(row, herb_col, Cell::Text(name.to_string()));
                // New rows start with every flag explicitly cleared.
                for &col in &flags {
                    table.set_cell(row, col, Cell::Bool(false));
                }
                (row, true)
            }
        };

        table.set_cell(row, status_col, Cell::Bool(true));

        if in_process {
            if let Some(col) = started_col {
                table.set_cell(row, col, Cell::Date(schedule.today));
            }
            if let Some(col) = ready_col {
                table.set_cell(row, col, Cell::Date(schedule.ready_on()));
            }
        }

        lines.push(if created {
            format!("✓ {} added and marked as {}", name, status_name)
        } else {
            format!("✓ {} marked as {}", name, status_name)
        });
    }

    Ok(Outcome {
        message: lines.join("\n"),
        data: json!({
            "herbs": herbs,
            "status": status_name,
            "action": "marked",
        }),
    })
}

// ── Clear ─────────────────────────────────────────────────────────────────────

/// Clears `status` on every listed herb. Unknown herbs are reported, not fatal.
pub fn clear_status(table: &mut Table, herbs: &[String], status: &str) -> AppResult<Outcome> {
    let herb_col = herb_column(table)?;
    let (status_col, status_name) = status_column(table, status)?;
    let in_process = is_in_process(&status_name);
    let started_col = table.column(DATE_STARTED);
    let ready_col = table.column(DATE_READY);

    let mut lines = Vec::with_capacity(herbs.len());

    for herb in herbs {
        let name = herb.trim();
        let Some(row) = table.find_row(herb_col, name) else {
            lines.push(format!("✗ {} not found", name));
            continue;
        };

        table.set_cell(row, status_col, Cell::Bool(false));

        if in_process {
            for col in [started_col, ready_col].into_iter().flatten() {
                table.set_cell(row, col, Cell::Empty);
            }
        }

        lines.push(format!("✓ {} cleared from {}", name, status_name));
    }

    Ok(Outcome {
        message: lines.join("\n"),
        data: json!({
            "herbs": herbs,
            "status": status_name,
            "action": "cleared",
        }),
    })
}

// ── Query ─────────────────────────────────────────────────────────────────────

/// `None`, blank and `"all"` all mean "report every status".
fn specific_query(query_type: Option<&str>) -> Option<&str> {
    query_type
        .map(str::trim)
        .filter(|q| !q.is_empty() && !q.eq_ignore_ascii_case("all"))
}

/// Reports one status (YES/NO) or every set status for each herb.
pub fn query_status(
    table: &Table,
    herbs: &[String],
    query_type: Option<&str>,
) -> AppResult<Outcome> {
    let herb_col = herb_column(table)?;
    let specific = specific_query(query_type)
        .map(|q| status_column(table, q))
        .transpose()?;
    let flags = status_columns(table);
    let ready_col = table.column(DATE_READY);

    let mut lines = Vec::with_capacity(herbs.len());
    let mut results: IndexMap<String, HerbStatus> = IndexMap::new();

    for herb in herbs {
        let name = herb.trim();
        let Some(row) = table.find_row(herb_col, name) else {
            lines.push(format!("{}: Not found", name));
            results.insert(name.to_string(), HerbStatus::not_found());
            continue;
        };

        let detail = match &specific {
            Some((col, status_name)) => {
                let value = table.cell(row, *col).is_true();
                lines.push(format!("{}: {}", name, if value { "YES" } else { "NO" }));
                HerbStatus {
                    found: true,
                    status: Some(status_name.clone()),
                    value: Some(value),
                    statuses: None,
                    date_ready: None,
                }
            }
            None => {
                let statuses = true_statuses(table, row, &flags);
                let date_ready = ready_col.and_then(|col| table.cell(row, col).as_date());

                let mut line = if statuses.is_empty() {
                    format!("{}: No statuses set", name)
                } else {
                    format!("{}: {}", name, statuses.join(", "))
                };
                if let Some(ready) = date_ready {
                    line.push_str(&format!(" (ready {})", ready.format("%b %-d")));
                }
                lines.push(line);

                HerbStatus {
                    found: true,
                    status: None,
                    value: None,
                    statuses: Some(statuses),
                    date_ready,
                }
            }
        };
        results.insert(name.to_string(), detail);
    }

    let query_label = specific
        .map(|(_, name)| name)
        .unwrap_or_else(|| "all".to_string());

    Ok(Outcome {
        message: lines.join("\n"),
        data: json!({
            "herbs": herbs,
            "queryType": query_label,
            "results": results,
            "action": "queried",
        }),
    })
}

// ── Listing ───────────────────────────────────────────────────────────────────

/// Every named row with its set statuses, in sheet order.
pub fn list_inventory(table: &Table) -> AppResult<Vec<HerbSummary>> {
    let herb_col = herb_column(table)?;
    let flags = status_columns(table);
    let started_col = table.column(DATE_STARTED);
    let ready_col = table.column(DATE_READY);

    Ok((0..table.len())
        .filter_map(|row| {
            let herb = table.cell(row, herb_col).to_field().trim().to_string();
            if herb.is_empty() {
                return None;
            }
            Some(HerbSummary {
                herb,
                statuses: true_statuses(table, row, &flags),
                date_started: started_col.and_then(|c| table.cell(row, c).as_date()),
                date_ready: ready_col.and_then(|c| table.cell(row, c).as_date()),
            })
        })
        .collect())
}
