/// Middleware layer para o Axum router
///
/// - Exigir sessão autenticada nas rotas que chamam o QuickBooks

pub mod session_guard;

pub use session_guard::require_session;
