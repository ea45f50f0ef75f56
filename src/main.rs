//! Main Application: middleware de sessão OAuth2 para o QuickBooks Online
//!
//! Arquitetura:
//! - `/api/v1/auth/*` conduz o fluxo OAuth2 (login, callback, status, refresh, logout)
//! - Tokens ficam no servidor; o browser só recebe um cookie HttpOnly assinado
//! - `/api/v1/employees` consome a API do QuickBooks com o token da sessão
//!
//! Stores em memória: sessões se perdem ao reiniciar o processo

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use qbo_auth_middleware::{app, config::Settings, utils::logging::*, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    // Inicializar tracing (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Carregar configurações
    let settings = Settings::new().context("Failed to load settings")?;

    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));
    log_info(&format!(
        "🔐 QuickBooks {:?} - redirect_uri: {}",
        settings.quickbooks.environment, settings.quickbooks.redirect_uri
    ));

    let state = Arc::new(AppState::from_settings(settings.clone()).context("Failed to build application state")?);

    // Limpeza periódica de states e sessões expirados
    let sweeper = state
        .flow
        .clone()
        .start_sweeper(Duration::from_secs(settings.session.sweep_interval_secs.max(1)));

    let router = app(state);

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    log_server_startup(settings.server.port);
    log_server_ready(&settings.server.host, settings.server.port);

    // Graceful shutdown com signal handling
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("❌ Falha ao instalar handler de Ctrl+C: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("❌ Falha ao instalar handler de SIGTERM: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
