use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings path like `provider.api_key` to `CORTEX_PROVIDER__API_KEY`
pub fn to_env_var(field_path: &str) -> String {
    format!("CORTEX_{}", field_path.replace('.', "__").to_uppercase())
}

/// Failures of a single chat request, rendered as `{ "error": ... }`
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("An Oura access token is required. Connect your ring or configure CORTEX_OURA__ACCESS_TOKEN.")]
    MissingCredential,
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
    /// Details are logged, never returned to the caller
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ChatError {
    pub fn status(&self) -> StatusCode {
        match self {
            ChatError::MissingCredential => StatusCode::BAD_REQUEST,
            ChatError::Timeout(_) | ChatError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        if let ChatError::Internal(e) = &self {
            tracing::error!(error = %e, "chat request failed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
