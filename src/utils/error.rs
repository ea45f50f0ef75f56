use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;

/// Causa de uma falha ao falar com o servidor OAuth2 / API da Intuit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorFailure {
    /// A chamada estourou o timeout configurado
    Timeout,
    /// Erro de conexão / transporte
    Network(String),
    /// O vendor respondeu com status de erro
    Rejected { status: u16, message: String },
    /// Resposta 2xx que não pôde ser interpretada
    Malformed(String),
}

impl VendorFailure {
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            VendorFailure::Timeout
        } else if err.is_decode() {
            VendorFailure::Malformed(err.to_string())
        } else {
            VendorFailure::Network(err.to_string())
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VendorFailure::Timeout)
    }

    fn status_code(&self) -> StatusCode {
        if self.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl std::fmt::Display for VendorFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VendorFailure::Timeout => write!(f, "timeout"),
            VendorFailure::Network(msg) => write!(f, "network: {}", msg),
            VendorFailure::Rejected { status, message } => write!(f, "[{}] {}", status, message),
            VendorFailure::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid or already used OAuth state. Restart the login flow.")]
    CsrfMismatch,

    #[error("Authorization denied by QuickBooks: {0}")]
    VendorDenied(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(VendorFailure),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(VendorFailure),

    #[error("Session not found. Call /auth/login first.")]
    SessionNotFound,

    #[error("Access token expired. Authenticate again.")]
    TokenExpired,

    #[error("QuickBooks API error [{status}]")]
    QuickBooksApi { status: u16, fault: Value },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Código estável exposto ao cliente (o SPA decide o que fazer a partir dele)
    pub fn code(&self) -> &'static str {
        match self {
            AppError::CsrfMismatch => "csrf_mismatch",
            AppError::VendorDenied(_) => "vendor_denied",
            AppError::TokenExchangeFailed(_) => "token_exchange_failed",
            AppError::RefreshFailed(_) => "refresh_failed",
            AppError::SessionNotFound => "session_not_found",
            AppError::TokenExpired => "token_expired",
            AppError::QuickBooksApi { .. } => "quickbooks_api_error",
            AppError::ConfigError(_) => "config_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::HttpError(_) => "http_error",
            AppError::InternalError(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::CsrfMismatch => StatusCode::BAD_REQUEST,
            AppError::VendorDenied(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound => StatusCode::UNAUTHORIZED,
            AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::TokenExchangeFailed(failure) => failure.status_code(),
            AppError::RefreshFailed(failure) => failure.status_code(),
            AppError::QuickBooksApi { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if code.is_client_error() => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::HttpError(err) if err.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            AppError::HttpError(_) => StatusCode::BAD_GATEWAY,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut body = json!({
            "error": self.to_string(),
            "code": self.code(),
            "status": status.as_u16()
        });

        match &self {
            AppError::CsrfMismatch | AppError::VendorDenied(_) => {
                body["restart_url"] = json!(crate::auth::LOGIN_PATH);
            }
            AppError::SessionNotFound | AppError::TokenExpired => {
                body["login_url"] = json!(crate::auth::LOGIN_PATH);
            }
            AppError::QuickBooksApi { fault, .. } => {
                body["fault"] = fault.clone();
            }
            _ => {}
        }

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_4xx() {
        assert_eq!(AppError::CsrfMismatch.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::VendorDenied("access_denied".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::SessionNotFound.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_vendor_timeout_is_distinct_from_rejection() {
        let timeout = AppError::RefreshFailed(VendorFailure::Timeout);
        let rejected = AppError::RefreshFailed(VendorFailure::Rejected {
            status: 400,
            message: "invalid_grant".into(),
        });

        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(rejected.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(timeout.code(), rejected.code());
    }

    #[test]
    fn test_quickbooks_status_passthrough() {
        let unauthorized = AppError::QuickBooksApi { status: 401, fault: Value::Null };
        let server = AppError::QuickBooksApi { status: 503, fault: Value::Null };

        assert_eq!(unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(server.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = vec![
            AppError::CsrfMismatch,
            AppError::VendorDenied("access_denied".into()),
            AppError::TokenExchangeFailed(VendorFailure::Timeout),
            AppError::RefreshFailed(VendorFailure::Timeout),
            AppError::SessionNotFound,
            AppError::TokenExpired,
            AppError::QuickBooksApi { status: 400, fault: Value::Null },
            AppError::ConfigError("x".into()),
            AppError::ValidationError("x".into()),
            AppError::InternalError("x".into()),
        ];

        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(!codes.contains(&"json_error"));
    }

    #[tokio::test]
    async fn test_csrf_response_carries_restart_hint() {
        let response = AppError::CsrfMismatch.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["code"], "csrf_mismatch");
        assert_eq!(body["restart_url"], crate::auth::LOGIN_PATH);
    }
}
