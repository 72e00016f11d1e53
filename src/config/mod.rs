//! Configuration module for the catalog service
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file. The resulting [`Config`] is built once at startup and handed to every
//! component that needs it.
//!
//! # Example
//!
//! ```no_run
//! use book_catalog::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("catalog.toml")).unwrap();
//! println!("Database: {}", config.storage.database_path);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{AuthConfig, Config, ScraperConfig, ServerConfig, StorageConfig, TokenEntry};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
