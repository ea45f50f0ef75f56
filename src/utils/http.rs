use std::time::Duration;

use crate::config::QuickBooksSettings;
use super::{AppError, AppResult};

/// Cliente HTTP compartilhado para todas as chamadas à Intuit
///
/// Nenhuma chamada ao vendor fica sem timeout: request e connect são limitados.
pub fn build_http_client(settings: &QuickBooksSettings) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_secs))
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .user_agent(concat!("qbo-auth-middleware/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}
