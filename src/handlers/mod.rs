// Handlers HTTP fora do fluxo OAuth2 (esses ficam em src/auth/handlers.rs)
pub mod employees;
pub mod health;

pub use employees::*;
pub use health::*;
