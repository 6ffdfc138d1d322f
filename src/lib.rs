pub mod cli;
pub mod config;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod utils;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use generator::workflow::{launch, launch_with_events};
