//! # QuickBooks OAuth2 Authentication Module
//!
//! Fluxo OAuth2 (authorization code) com a Intuit e o mapeamento
//! sessão → tokens guardado no servidor.
//!
//! ## Responsabilidades:
//! - Emitir e consumir states CSRF de uso único
//! - Trocar authorization code por tokens
//! - Guardar tokens por sessão (cookie assinado, HttpOnly)
//! - Renovar, revogar e validar tokens
//!
//! ## Estrutura:
//! - `config.rs`: Configurações OAuth2
//! - `client.rs`: Cliente HTTP OAuth2 (token/revoke endpoints)
//! - `token.rs`: `TokenRecord` e o verificador de validade
//! - `state_store.rs` / `session_store.rs`: Stores com TTL
//! - `cookies.rs`: Cookie de sessão assinado
//! - `flow.rs`: Controlador do fluxo
//! - `handlers.rs`: Handlers HTTP

pub mod config;
pub mod client;
pub mod cookies;
pub mod flow;
pub mod handlers;
pub mod session_store;
pub mod state_store;
pub mod token;

pub use config::OAuth2Config;
pub use client::OAuth2Client;
pub use cookies::SessionCookies;
pub use flow::{AuthStatus, AuthenticatedSession, CallbackParams, OAuthFlow};
pub use session_store::{InMemorySessionStore, SessionId, SessionStore};
pub use state_store::{InMemoryStateStore, StateStore};
pub use token::{is_valid, TokenRecord};

/// Onde o cliente deve reiniciar o login
pub const LOGIN_PATH: &str = "/api/v1/auth/login";
