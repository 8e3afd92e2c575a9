//! Nyaedge Config: `config.toml` model and data directory bootstrap.

pub mod dirs;
pub mod settings;

pub use settings::{ConfigError, Settings};
