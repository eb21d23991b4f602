//! Configuration module for calproxy
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables and command-line flags, then validated as a whole.
//!
//! # Example
//!
//! ```no_run
//! use calproxy::config::{load_config, ConfigOverrides};
//! use std::path::Path;
//!
//! let overrides = ConfigOverrides {
//!     target: Some("https://calendars.example.com/index.html".to_string()),
//!     ..Default::default()
//! };
//! let config = load_config(Some(Path::new("calproxy.toml")), overrides).unwrap();
//! println!("Refreshing every {}s", config.refresh.interval_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ConfigOverrides, RefreshConfig, ServerConfig, UpstreamConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
