//! Configuration module for Mercator
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use mercator_frontier::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mercator.toml")).unwrap();
//! println!("Politeness interval: {}ms", config.scheduler.politeness_interval);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetcherConfig, SchedulerConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
