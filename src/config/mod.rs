pub mod settings;

pub use settings::{QuickBooksEnvironment, QuickBooksSettings, ServerSettings, SessionSettings, Settings};
