use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream auth error: {0}")]
    Auth(String),

    #[error("Not found upstream: {0}")]
    NotFound(String),

    #[error("Upstream error (status={status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl AppError {
    /// Per-call upstream failures. These are caught at the call site and
    /// treated as "no data for this collection this cycle".
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::Http(_)
                | AppError::Auth(_)
                | AppError::NotFound(_)
                | AppError::Upstream { .. }
                | AppError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http(_) | AppError::Auth(_) | AppError::Upstream { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_family_is_classified() {
        assert!(AppError::Auth("bad key".into()).is_upstream());
        assert!(AppError::NotFound("azuki".into()).is_upstream());
        assert!(AppError::Upstream { status: 503, message: "busy".into() }.is_upstream());
        assert!(!AppError::Config("missing key".into()).is_upstream());
        assert!(!AppError::Persistence("disk full".into()).is_upstream());
    }
}
