use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};

pub const DEFAULT_SCOPES: &str = "com.intuit.quickbooks.accounting openid profile email phone address";

const SANDBOX_API_BASE_URL: &str = "https://sandbox-quickbooks.api.intuit.com/v3";
const PRODUCTION_API_BASE_URL: &str = "https://quickbooks.api.intuit.com/v3";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub quickbooks: QuickBooksSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Origens CORS separadas por vírgula
    pub allow_origins: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuickBooksEnvironment {
    Sandbox,
    Production,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuickBooksSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub environment: QuickBooksEnvironment,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    pub api_base_url: Option<String>,
    pub scopes: String,
    pub default_realm_id: Option<String>,
    pub http_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub minor_version: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub cookie_secret: String,
    pub cookie_secure: bool,
    pub session_ttl_secs: u64,
    pub state_ttl_secs: u64,
    pub app_root: String,
    pub sweep_interval_secs: u64,
    pub revoke_on_logout: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Self::defaults(Config::builder())?
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("QBO").separator("__"));

        // Variáveis "planas" herdadas do .env do projeto
        let overrides = [
            ("QUICKBOOKS_CLIENT_ID", "quickbooks.client_id"),
            ("QUICKBOOKS_CLIENT_SECRET", "quickbooks.client_secret"),
            ("QUICKBOOKS_REDIRECT_URI", "quickbooks.redirect_uri"),
            ("QUICKBOOKS_COMPANY_ID", "quickbooks.default_realm_id"),
            ("SESSION_SECRET", "session.cookie_secret"),
            ("PORT", "server.port"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8001)?
            .set_default("server.allow_origins", "http://localhost:8001,http://127.0.0.1:8001")?
            .set_default("quickbooks.client_id", "")?
            .set_default("quickbooks.client_secret", "")?
            .set_default("quickbooks.redirect_uri", "http://localhost:8001/api/v1/auth/callback")?
            .set_default("quickbooks.environment", "sandbox")?
            .set_default("quickbooks.auth_url", "https://appcenter.intuit.com/connect/oauth2")?
            .set_default("quickbooks.token_url", "https://oauth.platform.intuit.com/oauth2/v1/tokens/bearer")?
            .set_default("quickbooks.revoke_url", "https://developer.api.intuit.com/v2/oauth2/tokens/revoke")?
            .set_default("quickbooks.scopes", DEFAULT_SCOPES)?
            .set_default("quickbooks.http_timeout_secs", 30)?
            .set_default("quickbooks.connect_timeout_secs", 10)?
            .set_default("session.cookie_name", "qb_session")?
            .set_default("session.cookie_secret", "")?
            .set_default("session.cookie_secure", false)?
            .set_default("session.session_ttl_secs", 86_400)?
            .set_default("session.state_ttl_secs", 600)?
            .set_default("session.app_root", "/")?
            .set_default("session.sweep_interval_secs", 60)?
            .set_default("session.revoke_on_logout", true)
    }

    /// Falha cedo se o login ficaria meio configurado
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quickbooks.client_id.trim().is_empty() || self.quickbooks.client_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "QUICKBOOKS_CLIENT_ID e QUICKBOOKS_CLIENT_SECRET são obrigatórios".to_string(),
            ));
        }

        if self.session.cookie_secret.len() < 32 {
            return Err(ConfigError::Message(
                "SESSION_SECRET deve ter pelo menos 32 bytes".to_string(),
            ));
        }

        if self.session.state_ttl_secs == 0 || self.session.session_ttl_secs == 0 {
            return Err(ConfigError::Message("TTLs de sessão/state devem ser > 0".to_string()));
        }

        Ok(())
    }

    pub fn origins_list(&self) -> Vec<String> {
        self.server
            .allow_origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

impl QuickBooksSettings {
    pub fn api_base_url(&self) -> String {
        match &self.api_base_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => match self.environment {
                QuickBooksEnvironment::Sandbox => SANDBOX_API_BASE_URL.to_string(),
                QuickBooksEnvironment::Production => PRODUCTION_API_BASE_URL.to_string(),
            },
        }
    }
}
