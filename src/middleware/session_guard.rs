//! Middleware de sessão para rotas que consomem a API do QuickBooks
//!
//! Lê o cookie de sessão assinado, passa pelo gate do `OAuthFlow` (que renova
//! um token expirado uma vez) e coloca a `AuthenticatedSession` nas extensions.
//!
//! # Respostas
//!
//! - **handler**: sessão válida (ou renovada agora)
//! - **401 session_not_found**: sem cookie, cookie adulterado ou sessão desconhecida
//! - **401 token_expired**: token expirado e refresh falhou, login necessário

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::utils::{AppError, AppResult};
use crate::AppState;

pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let Some(session_id) = state.cookies.session_id(&jar) else {
        tracing::debug!("🔒 Requisição protegida sem cookie de sessão válido");
        return Err(AppError::SessionNotFound);
    };

    let session = state.flow.authorize(&session_id).await?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
