pub mod cli;
pub mod config;
pub mod error;
pub mod reclamation;
pub mod tui;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
