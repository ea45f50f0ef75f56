//! Session Store
//!
//! Mapeia o id opaco do cookie de sessão para o `TokenRecord` guardado no servidor.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::utils::{AppError, AppResult};
use super::token::{TokenRecord, TokenUpdate};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Aceita apenas ids no formato gerado pelo servidor
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok().map(|id| Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, record: TokenRecord) -> AppResult<SessionId>;

    /// Leitura pura; id desconhecido ou expirado → `SessionNotFound`
    async fn get(&self, id: &SessionId) -> AppResult<TokenRecord>;

    /// Substitui access token + expiração (+ refresh token) como uma unidade
    async fn update(&self, id: &SessionId, update: TokenUpdate) -> AppResult<TokenRecord>;

    /// Idempotente; devolve o registro removido, se havia um
    async fn delete(&self, id: &SessionId) -> AppResult<Option<TokenRecord>>;

    async fn purge_expired(&self) -> usize;
}

struct SessionEntry {
    record: TokenRecord,
    evict_at: Instant,
}

/// Implementação em memória: sessões se perdem ao reiniciar o processo
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, record: TokenRecord) -> AppResult<SessionId> {
        let mut sessions = self.sessions.write().await;

        let mut id = SessionId::generate();
        while sessions.contains_key(&id) {
            id = SessionId::generate();
        }

        sessions.insert(
            id.clone(),
            SessionEntry {
                record,
                evict_at: Instant::now() + self.ttl,
            },
        );

        Ok(id)
    }

    async fn get(&self, id: &SessionId) -> AppResult<TokenRecord> {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(entry) if Instant::now() < entry.evict_at => Ok(entry.record.clone()),
            _ => Err(AppError::SessionNotFound),
        }
    }

    async fn update(&self, id: &SessionId, update: TokenUpdate) -> AppResult<TokenRecord> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if Instant::now() < entry.evict_at => {
                entry.record.apply(update);
                Ok(entry.record.clone())
            }
            _ => Err(AppError::SessionNotFound),
        }
    }

    async fn delete(&self, id: &SessionId) -> AppResult<Option<TokenRecord>> {
        let removed = self.sessions.write().await.remove(id);
        Ok(removed
            .filter(|entry| Instant::now() < entry.evict_at)
            .map(|entry| entry.record))
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now < entry.evict_at);
        before - sessions.len()
    }
}
