//! OAuth2 HTTP Handlers
//!
//! Endpoints HTTP do fluxo OAuth2 com a Intuit. Tokens nunca aparecem nas
//! respostas: o browser só recebe o cookie de sessão assinado.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;
use super::flow::{AuthStatus, CallbackParams};

/// Redirect 302 (o `Redirect::to` do axum responde 303)
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// GET /api/v1/auth/login
///
/// Emite um state CSRF e redireciona para a página de autorização da Intuit
pub async fn login(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    log_request_received("/api/v1/auth/login", "GET");

    let auth_url = state.flow.login().await?;
    Ok(found(&auth_url))
}

/// GET /api/v1/auth/callback?code=&state=&realmId=&error=
///
/// # Retorno
/// - `302` para `app_root` com o cookie de sessão
/// - `400` em state inválido/reutilizado ou autorização negada
/// - `502`/`504` se o token endpoint falhar
pub async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> AppResult<(CookieJar, Response)> {
    log_request_received("/api/v1/auth/callback", "GET");

    let session_id = state.flow.callback(params).await?;
    let jar = jar.add(state.cookies.session_cookie(&session_id));

    Ok((jar, found(&state.settings.session.app_root)))
}

/// GET /api/v1/auth/status
///
/// Leitura pura: cookie ausente, adulterado ou de sessão desconhecida → `authenticated: false`
pub async fn status(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<AuthStatus> {
    let session_id = state.cookies.session_id(&jar);
    Json(state.flow.status(session_id.as_ref()).await)
}

/// POST /api/v1/auth/refresh
pub async fn refresh(State(state): State<Arc<AppState>>, jar: CookieJar) -> AppResult<Json<AuthStatus>> {
    log_request_received("/api/v1/auth/refresh", "POST");

    let session_id = state.cookies.session_id(&jar).ok_or(AppError::SessionNotFound)?;
    let record = state.flow.refresh(&session_id).await?;

    Ok(Json(AuthStatus::from_record(&record, Utc::now())))
}

/// POST /api/v1/auth/logout
///
/// Idempotente: sem sessão também responde 200 e limpa o cookie
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> AppResult<(CookieJar, Json<Value>)> {
    log_request_received("/api/v1/auth/logout", "POST");

    if let Some(session_id) = state.cookies.session_id(&jar) {
        state.flow.logout(&session_id).await?;
    }

    let jar = jar.add(state.cookies.removal_cookie());
    Ok((jar, Json(json!({
        "status": "success",
        "message": "Logged out"
    }))))
}
