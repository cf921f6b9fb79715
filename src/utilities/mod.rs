//! Utility modules: configuration, errors, logging and prompt templates.

pub mod config;
pub mod errors;
pub mod logger;
pub mod printer;
pub mod prompts;
