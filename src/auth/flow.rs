//! OAuth Flow Controller
//!
//! Orquestra login → callback → status / refresh / logout. É o único
//! componente que escreve nos dois stores.
//!
//! ## Estados de uma sessão:
//! `Unauthenticated → PendingCallback → Authenticated → (Expired | LoggedOut)`
//!
//! Falhas de rede no exchange ou no refresh nunca corrompem uma sessão
//! existente: o store só é escrito depois que o vendor respondeu com sucesso.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::utils::logging::*;
use crate::utils::{redact, AppError, AppResult};
use super::client::OAuth2Client;
use super::session_store::{SessionId, SessionStore};
use super::state_store::StateStore;
use super::token::{is_valid, TokenRecord, TokenUpdate};

/// Parâmetros do redirect da Intuit para o callback
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    #[serde(rename = "realmId")]
    pub realm_id: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Resposta de `/auth/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub token_valid: bool,
    pub realm_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthStatus {
    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            token_valid: false,
            realm_id: None,
            expires_at: None,
        }
    }

    pub fn from_record(record: &TokenRecord, now: DateTime<Utc>) -> Self {
        Self {
            authenticated: true,
            token_valid: is_valid(record, now),
            realm_id: Some(record.realm_id.clone()),
            expires_at: Some(record.expires_at),
        }
    }
}

/// Sessão liberada pelo gate: token válido pronto para a API da Intuit
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session_id: SessionId,
    pub access_token: String,
    pub realm_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedSession {
    fn new(session_id: SessionId, record: TokenRecord) -> Self {
        Self {
            session_id,
            access_token: record.access_token,
            realm_id: record.realm_id,
            expires_at: record.expires_at,
        }
    }
}

pub struct OAuthFlow {
    client: OAuth2Client,
    states: Arc<dyn StateStore>,
    sessions: Arc<dyn SessionStore>,
    default_realm_id: Option<String>,
    revoke_on_logout: bool,
    /// Um refresh por sessão de cada vez (a Intuit rotaciona o refresh token)
    refresh_locks: StdMutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl OAuthFlow {
    pub fn new(
        client: OAuth2Client,
        states: Arc<dyn StateStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            client,
            states,
            sessions,
            default_realm_id: None,
            revoke_on_logout: true,
            refresh_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Realm usado quando a Intuit não manda `realmId` no callback
    pub fn with_default_realm_id(mut self, realm_id: Option<String>) -> Self {
        self.default_realm_id = realm_id.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_revoke_on_logout(mut self, enabled: bool) -> Self {
        self.revoke_on_logout = enabled;
        self
    }

    /// Emite um state e devolve a URL de autorização da Intuit
    pub async fn login(&self) -> AppResult<String> {
        let state = self.states.issue().await?;
        let auth_url = self.client.config().authorization_url(&state);

        log_info(&format!("🚀 [OAuth2] Novo login, state emitido: {}", redact(&state)));
        Ok(auth_url)
    }

    /// Valida o callback, troca o code por tokens e cria a sessão
    pub async fn callback(&self, params: CallbackParams) -> AppResult<SessionId> {
        if let Some(error) = params.error {
            let detail = match params.error_description {
                Some(description) => format!("{} ({})", error, description),
                None => error,
            };
            log_warning(&format!("❌ [OAuth2] Autorização negada: {}", detail));
            return Err(AppError::VendorDenied(detail));
        }

        let state = params.state.unwrap_or_default();
        if state.is_empty() || !self.states.consume(&state).await? {
            log_warning(&format!("❌ [OAuth2] State inválido ou já usado: {}", redact(&state)));
            return Err(AppError::CsrfMismatch);
        }

        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::ValidationError("Missing code parameter".to_string()))?;

        let realm_id = params
            .realm_id
            .filter(|r| !r.is_empty())
            .or_else(|| self.default_realm_id.clone())
            .ok_or_else(|| AppError::ValidationError("Missing realmId parameter".to_string()))?;

        let token = self
            .client
            .exchange_code_for_token(&code)
            .await
            .map_err(AppError::TokenExchangeFailed)?;

        let update = TokenUpdate::from_response(token, Utc::now()).map_err(|failure| {
            log_error(&format!("❌ [OAuth2] Resposta do exchange rejeitada: {}", failure));
            AppError::TokenExchangeFailed(failure)
        })?;

        let realm = realm_id.clone();
        let session_id = self.sessions.create(TokenRecord::issued(realm_id, update)).await?;

        log_session_event(&format!("Sessão criada (realm {})", realm), session_id.as_str());
        Ok(session_id)
    }

    /// Leitura pura do store: nunca chama o vendor nem altera estado
    pub async fn status(&self, session_id: Option<&SessionId>) -> AuthStatus {
        let Some(session_id) = session_id else {
            return AuthStatus::unauthenticated();
        };

        match self.sessions.get(session_id).await {
            Ok(record) => AuthStatus::from_record(&record, Utc::now()),
            Err(AppError::SessionNotFound) => AuthStatus::unauthenticated(),
            Err(e) => {
                log_error(&format!("❌ [Session] Falha ao ler sessão para status: {}", e));
                AuthStatus::unauthenticated()
            }
        }
    }

    /// Renova o access token; em falha o registro anterior fica intacto
    pub async fn refresh(&self, session_id: &SessionId) -> AppResult<TokenRecord> {
        let lock = self.refresh_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.refresh_locked(session_id).await
        };
        drop(lock);
        self.release_refresh_lock(session_id);
        result
    }

    async fn refresh_locked(&self, session_id: &SessionId) -> AppResult<TokenRecord> {
        let record = self.sessions.get(session_id).await?;

        let update = self
            .client
            .refresh_access_token(&record.refresh_token)
            .await
            .and_then(|token| TokenUpdate::from_response(token, Utc::now()))
            .map_err(|failure| {
                log_error(&format!(
                    "❌ [OAuth2] Refresh falhou, sessão mantida como estava: {}",
                    failure
                ));
                AppError::RefreshFailed(failure)
            })?;

        let updated = self.sessions.update(session_id, update).await?;

        log_session_event("Access token renovado", session_id.as_str());
        Ok(updated)
    }

    /// Apaga a sessão (idempotente) e revoga o refresh token em best-effort
    pub async fn logout(&self, session_id: &SessionId) -> AppResult<()> {
        let removed = self.sessions.delete(session_id).await?;
        self.release_refresh_lock(session_id);

        let Some(record) = removed else {
            log_session_event("Logout de sessão inexistente", session_id.as_str());
            return Ok(());
        };

        log_session_event("Logout", session_id.as_str());

        if self.revoke_on_logout {
            if let Err(failure) = self.client.revoke_token(&record.refresh_token).await {
                log_warning(&format!("⚠️ [OAuth2] Revogação no logout falhou: {}", failure));
            }
        }

        Ok(())
    }

    /// Gate de requisições protegidas
    ///
    /// Token válido segue direto; token expirado tenta um refresh. Se o refresh
    /// falhar, o chamador precisa refazer o login (`TokenExpired`).
    pub async fn authorize(&self, session_id: &SessionId) -> AppResult<AuthenticatedSession> {
        let record = self.sessions.get(session_id).await?;
        if is_valid(&record, Utc::now()) {
            return Ok(AuthenticatedSession::new(session_id.clone(), record));
        }

        log_info("⏰ [Session] Access token expirado, tentando refresh antes de seguir");

        let lock = self.refresh_lock(session_id);
        let result = {
            let _guard = lock.lock().await;

            // outra requisição pode ter renovado enquanto esperávamos o lock
            match self.sessions.get(session_id).await {
                Ok(current) if is_valid(&current, Utc::now()) => Ok(current),
                Ok(_) => self.refresh_locked(session_id).await,
                Err(e) => Err(e),
            }
        };
        drop(lock);
        self.release_refresh_lock(session_id);

        match result {
            Ok(record) => Ok(AuthenticatedSession::new(session_id.clone(), record)),
            Err(AppError::RefreshFailed(failure)) => {
                log_warning(&format!("⚠️ [Session] Refresh no gate falhou ({}), login necessário", failure));
                Err(AppError::TokenExpired)
            }
            Err(e) => Err(e),
        }
    }

    /// Executa uma chamada à API com o token da sessão; em 401 faz um refresh e tenta de novo uma vez
    pub async fn with_access_token<T, F, Fut>(&self, session_id: &SessionId, call: F) -> AppResult<T>
    where
        F: Fn(AuthenticatedSession) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let session = self.authorize(session_id).await?;

        match call(session).await {
            Err(AppError::QuickBooksApi { status: 401, .. }) => {
                log_warning("🔁 [Session] QuickBooks respondeu 401, renovando token e repetindo uma vez");

                let record = self.refresh(session_id).await.map_err(|e| match e {
                    AppError::RefreshFailed(_) => AppError::TokenExpired,
                    other => other,
                })?;

                call(AuthenticatedSession::new(session_id.clone(), record)).await
            }
            other => other,
        }
    }

    /// Remove states e sessões expirados dos stores
    pub async fn purge_expired(&self) -> (usize, usize) {
        let states = self.states.purge_expired().await;
        let sessions = self.sessions.purge_expired().await;
        log_store_sweep(states, sessions);
        (states, sessions)
    }

    /// Inicia a limpeza periódica dos stores
    pub fn start_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tracing::info!("🕐 Sweeper iniciado: limpa stores a cada {}s", every.as_secs());

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // o primeiro tick é imediato
            interval.tick().await;

            loop {
                interval.tick().await;
                self.purge_expired().await;
            }
        })
    }

    fn refresh_lock(&self, session_id: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self
            .refresh_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(session_id.clone()).or_default().clone()
    }

    /// Descarta o lock quando ninguém mais o segura
    fn release_refresh_lock(&self, session_id: &SessionId) {
        let mut locks = self
            .refresh_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.get(session_id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(session_id);
        }
    }
}
