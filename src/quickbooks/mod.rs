//! Recursos da API do QuickBooks Online consumidos com o token da sessão

pub mod client;
pub mod employees;

pub use client::{parse_fault, QuickBooksClient};
pub use employees::EmployeeQuery;
