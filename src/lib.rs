// Biblioteca do middleware de autenticação QuickBooks Online
// Expõe módulos e o router para uso em testes e no binário

pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod quickbooks;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use auth::{InMemorySessionStore, InMemoryStateStore, OAuth2Client, OAuth2Config, OAuthFlow, SessionCookies};
use quickbooks::QuickBooksClient;
use utils::{build_http_client, AppResult};

// AppState é definido aqui para ser compartilhado
pub struct AppState {
    pub settings: config::Settings,
    pub flow: Arc<OAuthFlow>,
    pub cookies: SessionCookies,
    pub quickbooks: QuickBooksClient,
}

impl AppState {
    /// Monta stores em memória, clientes HTTP e o controlador do fluxo
    pub fn from_settings(settings: config::Settings) -> AppResult<Self> {
        let http_client = build_http_client(&settings.quickbooks)?;

        let states = Arc::new(InMemoryStateStore::new(Duration::from_secs(settings.session.state_ttl_secs)));
        let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(settings.session.session_ttl_secs)));

        let oauth_client = OAuth2Client::new(OAuth2Config::from_settings(&settings.quickbooks), http_client.clone());
        let flow = OAuthFlow::new(oauth_client, states, sessions)
            .with_default_realm_id(settings.quickbooks.default_realm_id.clone())
            .with_revoke_on_logout(settings.session.revoke_on_logout);

        Ok(Self {
            cookies: SessionCookies::new(&settings.session)?,
            quickbooks: QuickBooksClient::new(http_client, &settings.quickbooks),
            flow: Arc::new(flow),
            settings,
        })
    }
}

/// Router completo da API (`/api/v1/...`)
pub fn app(state: Arc<AppState>) -> Router {
    // Rotas que exigem sessão autenticada
    let protected = Router::new()
        .route("/employees", get(handlers::list_employees).post(handlers::create_employee))
        .route(
            "/employees/:id",
            get(handlers::get_employee)
                .put(handlers::update_employee)
                .delete(handlers::deactivate_employee),
        )
        .route("/employees/:id/activate", post(handlers::activate_employee))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_session));

    let api = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/login", get(auth::handlers::login))
        .route("/auth/callback", get(auth::handlers::callback))
        .route("/auth/status", get(auth::handlers::status))
        .route("/auth/refresh", post(auth::handlers::refresh))
        .route("/auth/logout", post(auth::handlers::logout))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .layer(cors_layer(&state.settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS com credenciais: o SPA manda o cookie de sessão
fn cors_layer(settings: &config::Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .origins_list()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
