//! CSRF State Store
//!
//! States de uso único emitidos no `login` e consumidos no `callback`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::utils::AppResult;

/// Bytes aleatórios por state (43 caracteres em base64url)
pub const STATE_ENTROPY_BYTES: usize = 32;

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Emite um state novo e o registra como pendente
    async fn issue(&self) -> AppResult<String>;

    /// Remove o state e devolve `true` apenas na primeira vez (e se não expirou)
    async fn consume(&self, state: &str) -> AppResult<bool>;

    /// Remove states expirados, devolvendo quantos saíram
    async fn purge_expired(&self) -> usize;
}

pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Implementação em memória (volátil: reiniciar o processo perde os states)
pub struct InMemoryStateStore {
    ttl: Duration,
    pending: Mutex<HashMap<String, Instant>>,
}

impl InMemoryStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn issue(&self) -> AppResult<String> {
        let mut pending = self.pending.lock().await;

        let mut state = generate_state();
        while pending.contains_key(&state) {
            state = generate_state();
        }

        pending.insert(state.clone(), Instant::now() + self.ttl);
        Ok(state)
    }

    async fn consume(&self, state: &str) -> AppResult<bool> {
        // remove sob o lock: duas chamadas concorrentes nunca veem a mesma entrada
        let expires_at = self.pending.lock().await.remove(state);

        Ok(matches!(expires_at, Some(deadline) if Instant::now() < deadline))
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|_, deadline| now < *deadline);
        before - pending.len()
    }
}
