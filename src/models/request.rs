use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Every `action` value the dispatcher routes.
pub const ACTIONS: &[&str] = &["mark_status", "clear_status", "query"];

/// `herbs` may be a single name or a list of names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HerbList {
    One(String),
    Many(Vec<String>),
}

impl HerbList {
    /// Trimmed, non-empty names in request order.
    pub fn names(&self) -> AppResult<Vec<String>> {
        let raw: &[String] = match self {
            HerbList::One(name) => std::slice::from_ref(name),
            HerbList::Many(names) => names,
        };
        let names: Vec<String> = raw
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(AppError::BadRequest("No herb names provided".to_string()));
        }
        Ok(names)
    }
}

/// A validated request body, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InventoryRequest {
    MarkStatus {
        herbs: HerbList,
        #[serde(rename = "statusType")]
        status_type: String,
    },
    ClearStatus {
        herbs: HerbList,
        #[serde(rename = "statusType")]
        status_type: String,
    },
    Query {
        herbs: HerbList,
        #[serde(rename = "queryType", default)]
        query_type: Option<String>,
    },
}

impl InventoryRequest {
    pub fn action(&self) -> &'static str {
        match self {
            InventoryRequest::MarkStatus { .. } => "mark_status",
            InventoryRequest::ClearStatus { .. } => "clear_status",
            InventoryRequest::Query { .. } => "query",
        }
    }
}

/// `statusType` must name a column; blank counts as missing.
pub fn required_status(status_type: &str) -> AppResult<&str> {
    let trimmed = status_type.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Missing required field: statusType".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Uniform response body for every dispatched request.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_herb_string_is_accepted() {
        let req: InventoryRequest = serde_json::from_value(json!({
            "action": "mark_status",
            "herbs": " Nettle ",
            "statusType": "Low",
        }))
        .unwrap();
        match req {
            InventoryRequest::MarkStatus { herbs, status_type } => {
                assert_eq!(herbs.names().unwrap(), vec!["Nettle"]);
                assert_eq!(status_type, "Low");
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn query_type_is_optional() {
        let req: InventoryRequest = serde_json::from_value(json!({
            "action": "query",
            "herbs": ["Yarrow", "Angelica"],
        }))
        .unwrap();
        assert_eq!(req.action(), "query");
        match req {
            InventoryRequest::Query { herbs, query_type } => {
                assert_eq!(herbs.names().unwrap().len(), 2);
                assert!(query_type.is_none());
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn mark_without_status_type_is_rejected() {
        let res = serde_json::from_value::<InventoryRequest>(json!({
            "action": "mark_status",
            "herbs": "Yarrow",
        }));
        assert!(res.is_err());
    }

    #[test]
    fn blank_names_are_dropped() {
        let herbs = HerbList::Many(vec!["  ".into(), "Skullcap".into(), "".into()]);
        assert_eq!(herbs.names().unwrap(), vec!["Skullcap"]);
        assert!(HerbList::One("   ".into()).names().is_err());
    }

    #[test]
    fn blank_status_type_counts_as_missing() {
        assert!(required_status("  ").is_err());
        assert_eq!(required_status(" Out ").unwrap(), "Out");
    }

    #[test]
    fn failure_envelope_has_no_data() {
        let v = serde_json::to_value(Envelope::failure("boom")).unwrap();
        assert_eq!(v["success"], false);
        assert_eq!(v["message"], "boom");
        assert!(v.get("data").is_none());
        assert!(v["timestamp"].is_string());
    }
}
