//! Server options (`kiln.toml`) and project configuration (`tsconfig.json`).
//!
//! [`ServerOptions`] carries everything that shapes the served output and is
//! hashed into the cache fingerprint. [`ProjectConfig`] is the part of the
//! project configuration the build engine reads on every pass.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_options, load_options_from_str, parse_project_config, read_manifest, MANIFEST_FILE,
    OPTIONS_FILE, PROJECT_CONFIG_FILE,
};
pub use types::*;
