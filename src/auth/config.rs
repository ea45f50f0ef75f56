//! OAuth2 Configuration
//!
//! Centraliza as configurações OAuth2 da Intuit (QuickBooks Online)

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::QuickBooksSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// Client ID do app no Intuit Developer
    pub client_id: String,

    /// Client Secret do app no Intuit Developer
    pub client_secret: String,

    /// URL de callback registrada no app (deve bater exatamente)
    pub redirect_uri: String,

    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,

    /// Escopos separados por espaço
    pub scopes: String,
}

impl OAuth2Config {
    pub fn from_settings(settings: &QuickBooksSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            redirect_uri: settings.redirect_uri.clone(),
            auth_url: settings.auth_url.clone(),
            token_url: settings.token_url.clone(),
            revoke_url: settings.revoke_url.clone(),
            scopes: settings.scopes.clone(),
        }
    }

    /// Gerar URL de autorização da Intuit para um state já emitido
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scopes),
            urlencoding::encode(state)
        )
    }

    /// Header `Authorization: Basic base64(client_id:client_secret)` exigido pelo token endpoint
    pub fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuth2Config {
        OAuth2Config {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_uri: "https://example.com/api/v1/auth/callback".to_string(),
            auth_url: "https://appcenter.intuit.com/connect/oauth2".to_string(),
            token_url: "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer".to_string(),
            revoke_url: "https://developer.api.intuit.com/v2/oauth2/tokens/revoke".to_string(),
            scopes: "com.intuit.quickbooks.accounting openid".to_string(),
        }
    }

    #[test]
    fn test_authorization_url() {
        let url = config().authorization_url("abc-123_XYZ");

        assert!(url.starts_with("https://appcenter.intuit.com/connect/oauth2?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Fapi%2Fv1%2Fauth%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=com.intuit.quickbooks.accounting%20openid"));
        assert!(url.ends_with("state=abc-123_XYZ"));
    }

    #[test]
    fn test_basic_auth_header() {
        // base64("test_client_id:test_secret")
        assert_eq!(
            config().basic_auth_header(),
            "Basic dGVzdF9jbGllbnRfaWQ6dGVzdF9zZWNyZXQ="
        );
    }
}
