use std::sync::PoisonError;

use axum::{body::Bytes, extract::State, Json};
use chrono::Local;
use serde_json::Value;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::{
    db::SheetStore,
    error::{AppError, AppResult},
    inventory::{self, Outcome, Schedule},
    models::{required_status, Envelope, InventoryRequest, ACTIONS},
    AppState,
};

// ── POST / ────────────────────────────────────────────────────────────────────

/// Always answers 200 with an [`Envelope`]; failures are reported in-band.
pub async fn handle_request(State(state): State<AppState>, body: Bytes) -> Json<Envelope> {
    let request_id = Uuid::new_v4();
    let span = info_span!("inventory_request", %request_id);
    let schedule = Schedule::new(Local::now().date_naive(), state.steep_days);
    let store = state.store.clone();
    let sheet = state.sheet_name.clone();

    let result = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        // A panicked request leaves nothing behind: every request reloads the sheet.
        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
        dispatch(&mut *store, &sheet, &body, &schedule)
    })
    .await;

    let envelope = match result {
        Ok(envelope) => envelope,
        Err(e) => Envelope::failure(format!("Internal error: {}", e)),
    };

    info!(%request_id, success = envelope.success, "Handled inventory request");
    Json(envelope)
}

/// Parses, validates and routes one request body against `sheet`.
/// Never returns an error; every failure becomes `success: false`.
pub fn dispatch(
    store: &mut dyn SheetStore,
    sheet: &str,
    body: &[u8],
    schedule: &Schedule,
) -> Envelope {
    match process(store, sheet, body, schedule) {
        Ok(outcome) => Envelope::ok(outcome.message, outcome.data),
        Err(e) => {
            warn!(error = %e, "Inventory request failed");
            Envelope::failure(e.to_string())
        }
    }
}

fn process(
    store: &mut dyn SheetStore,
    sheet: &str,
    body: &[u8],
    schedule: &Schedule,
) -> AppResult<Outcome> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("No request body provided".to_string()));
    }

    let raw: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON: {}", e)))?;
    if !raw.is_object() {
        return Err(AppError::BadRequest(
            "Invalid JSON: request body must be an object".to_string(),
        ));
    }

    let action = match raw.get("action").and_then(Value::as_str).map(str::trim) {
        Some(a) if !a.is_empty() => a.to_string(),
        _ => {
            return Err(AppError::BadRequest(
                "Missing required field: action".to_string(),
            ))
        }
    };

    let mut table = store
        .load(sheet)?
        .ok_or_else(|| AppError::SheetNotFound(sheet.to_string()))?;

    if !ACTIONS.contains(&action.as_str()) {
        return Err(AppError::UnknownAction(action));
    }

    let request: InventoryRequest = serde_json::from_value(raw)
        .map_err(|e| AppError::BadRequest(format!("Invalid {} request: {}", action, e)))?;
    debug!(action = request.action(), "Dispatching");

    match request {
        InventoryRequest::MarkStatus { herbs, status_type } => {
            let herbs = herbs.names()?;
            let status = required_status(&status_type)?;
            debug!(herbs = herbs.len(), status, "Marking");
            let outcome = inventory::mark_status(&mut table, &herbs, status, schedule)?;
            store.save(sheet, &table)?;
            Ok(outcome)
        }
        InventoryRequest::ClearStatus { herbs, status_type } => {
            let herbs = herbs.names()?;
            let status = required_status(&status_type)?;
            debug!(herbs = herbs.len(), status, "Clearing");
            let outcome = inventory::clear_status(&mut table, &herbs, status)?;
            store.save(sheet, &table)?;
            Ok(outcome)
        }
        InventoryRequest::Query { herbs, query_type } => {
            let herbs = herbs.names()?;
            debug!(herbs = herbs.len(), query_type = ?query_type, "Querying");
            inventory::query_status(&table, &herbs, query_type.as_deref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CsvSheetStore, MemorySheetStore};
    use crate::inventory::DEFAULT_HEADER;
    use crate::models::{Cell, Table};
    use chrono::NaiveDate;
    use serde_json::json;

    const SHEET: &str = "Inventory";

    fn schedule() -> Schedule {
        Schedule::new(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(), 42)
    }

    fn store() -> MemorySheetStore {
        let header = DEFAULT_HEADER.iter().map(|h| h.to_string()).collect();
        MemorySheetStore::with_sheet(
            SHEET,
            Table::with_rows(
                header,
                vec![vec![
                    Cell::Text("Yarrow".into()),
                    Cell::Bool(false),
                    Cell::Bool(false),
                    Cell::Bool(false),
                    Cell::Bool(true),
                ]],
            ),
        )
    }

    fn send(store: &mut MemorySheetStore, body: Value) -> Envelope {
        dispatch(store, SHEET, body.to_string().as_bytes(), &schedule())
    }

    #[test]
    fn empty_body_is_rejected() {
        let env = dispatch(&mut store(), SHEET, b"  ", &schedule());
        assert!(!env.success);
        assert_eq!(env.message, "No request body provided");
    }

    #[test]
    fn malformed_json_is_rejected() {
        let env = dispatch(&mut store(), SHEET, b"{action:", &schedule());
        assert!(!env.success);
        assert!(env.message.starts_with("Invalid JSON"));
    }

    #[test]
    fn json_that_is_not_an_object_is_rejected() {
        let bodies: [&[u8]; 3] = [b"[]", b"\"mark_status\"", b"42"];
        for body in bodies {
            let env = dispatch(&mut store(), SHEET, body, &schedule());
            assert!(!env.success);
            assert_eq!(env.message, "Invalid JSON: request body must be an object");
        }
    }

    #[test]
    fn missing_herbs_is_rejected() {
        let env = send(
            &mut store(),
            json!({ "action": "mark_status", "statusType": "Low" }),
        );
        assert!(!env.success);
        assert!(env.message.contains("herbs"), "{}", env.message);
    }

    #[test]
    fn empty_herb_list_is_rejected() {
        let mut s = store();
        let before = s.sheets[SHEET].clone();
        for body in [
            json!({ "action": "mark_status", "herbs": [], "statusType": "Low" }),
            json!({ "action": "clear_status", "herbs": ["  "], "statusType": "Low" }),
            json!({ "action": "query", "herbs": "" }),
        ] {
            let env = send(&mut s, body);
            assert!(!env.success);
            assert_eq!(env.message, "No herb names provided");
        }
        assert_eq!(s.sheets[SHEET], before);
    }

    #[test]
    fn csv_store_round_trips_through_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = CsvSheetStore::new(dir.path());
        csv.ensure_sheet(SHEET, DEFAULT_HEADER).unwrap();

        let env = dispatch(
            &mut csv,
            SHEET,
            json!({ "action": "mark_status", "herbs": ["Chamomile"], "statusType": "In Tincture" })
                .to_string()
                .as_bytes(),
            &schedule(),
        );
        assert!(env.success, "{}", env.message);

        // A fresh handle sees only what reached the file.
        let mut reopened = CsvSheetStore::new(dir.path());
        let env = dispatch(
            &mut reopened,
            SHEET,
            json!({ "action": "query", "herbs": " chamomile " }).to_string().as_bytes(),
            &schedule(),
        );
        assert!(env.success, "{}", env.message);
        assert_eq!(env.message, "chamomile: In Tincture (ready Nov 29)");

        let env = dispatch(
            &mut reopened,
            SHEET,
            json!({ "action": "clear_status", "herbs": "Chamomile", "statusType": "In Tincture" })
                .to_string()
                .as_bytes(),
            &schedule(),
        );
        assert!(env.success, "{}", env.message);

        let table = CsvSheetStore::new(dir.path()).load(SHEET).unwrap().unwrap();
        let row = table.find_row(0, "Chamomile").unwrap();
        assert_eq!(table.cell(row, 3), &Cell::Bool(false));
        assert_eq!(table.cell(row, 5), &Cell::Empty);
        assert_eq!(table.cell(row, 6), &Cell::Empty);
    }

    #[test]
    fn missing_action_is_rejected_before_sheet_lookup() {
        let mut empty = MemorySheetStore::default();
        let env = send(&mut empty, json!({ "herbs": "Yarrow" }));
        assert_eq!(env.message, "Missing required field: action");
    }

    #[test]
    fn missing_sheet_is_reported() {
        let mut empty = MemorySheetStore::default();
        let env = send(&mut empty, json!({ "action": "query", "herbs": "Yarrow" }));
        assert!(!env.success);
        assert_eq!(env.message, "Sheet \"Inventory\" not found");
    }

    #[test]
    fn unknown_action_is_reported() {
        let env = send(&mut store(), json!({ "action": "restock", "herbs": "Yarrow" }));
        assert!(!env.success);
        assert_eq!(env.message, "Unknown action: restock");
    }

    #[test]
    fn mark_without_status_type_fails_in_band() {
        let env = send(&mut store(), json!({ "action": "mark_status", "herbs": "Yarrow" }));
        assert!(!env.success);
        assert!(env.message.contains("statusType"), "{}", env.message);
    }

    #[test]
    fn mark_persists_and_query_reads_back() {
        let mut s = store();
        let env = send(
            &mut s,
            json!({
                "action": "mark_status",
                "herbs": ["Chamomile", "Motherwort"],
                "statusType": "In Tincture",
            }),
        );
        assert!(env.success, "{}", env.message);
        assert_eq!(
            env.data.unwrap(),
            json!({
                "herbs": ["Chamomile", "Motherwort"],
                "status": "In Tincture",
                "action": "marked",
            })
        );
        assert_eq!(s.sheets[SHEET].len(), 3);

        let env = send(&mut s, json!({ "action": "query", "herbs": "chamomile" }));
        assert!(env.success);
        let data = env.data.unwrap();
        assert_eq!(data["results"]["chamomile"]["statuses"], json!(["In Tincture"]));
    }

    #[test]
    fn query_does_not_write() {
        let mut s = store();
        let before = s.sheets[SHEET].clone();
        let env = send(
            &mut s,
            json!({ "action": "query", "herbs": ["Yarrow", "Angelica"], "queryType": "Clinic Backstock" }),
        );
        assert_eq!(env.message, "Yarrow: YES\nAngelica: Not found");
        assert_eq!(s.sheets[SHEET], before);
    }

    #[test]
    fn failed_mark_leaves_sheet_untouched() {
        let mut s = store();
        let before = s.sheets[SHEET].clone();
        let env = send(
            &mut s,
            json!({ "action": "mark_status", "herbs": "Yarrow", "statusType": "Dried" }),
        );
        assert!(!env.success);
        assert_eq!(s.sheets[SHEET], before);
    }

    #[test]
    fn clear_reports_missing_herbs_inline() {
        let env = send(
            &mut store(),
            json!({ "action": "clear_status", "herbs": ["Baptisia", "Yarrow"], "statusType": "Clinic Backstock" }),
        );
        assert!(env.success);
        assert_eq!(
            env.message,
            "✗ Baptisia not found\n✓ Yarrow cleared from Clinic Backstock"
        );
    }
}
