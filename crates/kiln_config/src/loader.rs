//! Loading of `kiln.toml` server options and `tsconfig.json` project configuration.

use crate::error::ConfigError;
use crate::types::{ProjectConfig, ServerOptions};
use std::io::ErrorKind;
use std::path::Path;

/// File name of the server options file in the project root.
pub const OPTIONS_FILE: &str = "kiln.toml";

/// File name of the project configuration in the project root.
pub const PROJECT_CONFIG_FILE: &str = "tsconfig.json";

/// File name of the project manifest hashed into the cache fingerprint.
pub const MANIFEST_FILE: &str = "package.json";

/// Loads server options from `<project_dir>/kiln.toml`.
///
/// A missing file yields default options; any other read failure is an error.
pub fn load_options(project_dir: &Path) -> Result<ServerOptions, ConfigError> {
    let path = project_dir.join(OPTIONS_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => load_options_from_str(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ServerOptions::default()),
        Err(e) => Err(e.into()),
    }
}

/// Parses and validates server options from TOML text.
pub fn load_options_from_str(content: &str) -> Result<ServerOptions, ConfigError> {
    let options: ServerOptions =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_options(&options)?;
    Ok(options)
}

fn validate_options(options: &ServerOptions) -> Result<(), ConfigError> {
    if let Some(tsconfig) = &options.tsconfig {
        if !tsconfig.is_object() {
            return Err(ConfigError::ValidationError(
                "`tsconfig` must be a table".to_string(),
            ));
        }
    }
    if let Some(target) = &options.transform.target {
        if target.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "`transform.target` must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

/// Parses project configuration text (`tsconfig.json`).
///
/// Line and block comments are accepted, as in hand-written tsconfig files.
pub fn parse_project_config(content: &str) -> Result<ProjectConfig, ConfigError> {
    let stripped = strip_json_comments(content);
    serde_json::from_str(&stripped).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Reads the project manifest text, or an empty string if it cannot be read.
pub fn read_manifest(project_dir: &Path) -> String {
    std::fs::read_to_string(project_dir.join(MANIFEST_FILE)).unwrap_or_default()
}

/// Removes `//` and `/* */` comments outside of string literals.
fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(c),
        }
    }

    out
}
