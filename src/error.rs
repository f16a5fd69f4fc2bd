use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Sheet \"{0}\" not found")]
    SheetNotFound(String),

    #[error("{kind} \"{name}\" not found")]
    ColumnNotFound { kind: &'static str, name: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// A structural column ("Herb Name", ...) is missing from the header.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { kind: "Column", name: name.into() }
    }

    /// The requested status column is missing from the header.
    pub fn missing_status(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { kind: "Status column", name: name.into() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::SheetNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_)
            | AppError::UnknownAction(_)
            | AppError::ColumnNotFound { .. } => StatusCode::BAD_REQUEST,
            _ => {
                tracing::error!("Internal error: {:?}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
