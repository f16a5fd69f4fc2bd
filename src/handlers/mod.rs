pub mod dispatch;
pub mod inventory;

use axum::{http::StatusCode, Json};
use serde_json::json;

pub const USAGE: &str = "\
Herb inventory service

POST / with a JSON body:
  {\"action\": \"mark_status\",  \"herbs\": [\"Chamomile\"], \"statusType\": \"In Tincture\"}
  {\"action\": \"clear_status\", \"herbs\": \"Yarrow\",      \"statusType\": \"Low\"}
  {\"action\": \"query\",        \"herbs\": [\"Yarrow\"],    \"queryType\": \"Clinic Backstock\"}

Statuses are the sheet's flag columns, e.g. Low, Out, In Tincture, Clinic Backstock.
Omit queryType to list every status set for each herb.
";

pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok", "service": "herb-inventory" })))
}

/// Plaintext banner for `GET /`.
pub async fn usage() -> &'static str {
    USAGE
}
