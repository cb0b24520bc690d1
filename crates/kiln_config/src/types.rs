//! Configuration types: server options from `kiln.toml` and the subset of
//! `tsconfig.json` the build engine understands.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Port used when none is configured (or when it is configured as `0`).
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable carrying the production-mode signal.
pub const MODE_ENV_VAR: &str = "NODE_ENV";

/// Server options, loaded from `kiln.toml` and overridable from the CLI.
///
/// The serialized form of this struct is part of the cache fingerprint, so
/// every field that changes build output must serialize deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerOptions {
    /// Override for the project configuration. When set, the build engine
    /// sees this value as `tsconfig.json` instead of the file on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsconfig: Option<serde_json::Value>,
    /// Options for the secondary source transform.
    #[serde(default)]
    pub transform: TransformConfig,
    /// Listen port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Directory holding cache snapshots. Not part of the fingerprint.
    #[serde(default, skip_serializing)]
    pub cache_dir: Option<PathBuf>,
}

impl ServerOptions {
    /// The effective listen port; unset and `0` both mean [`DEFAULT_PORT`].
    pub fn port(&self) -> u16 {
        self.port.filter(|p| *p != 0).unwrap_or(DEFAULT_PORT)
    }

    /// Address the HTTP listener binds: all interfaces on [`port`](Self::port).
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port()))
    }

    /// Directory for cache snapshots, defaulting to the OS temp directory.
    pub fn snapshot_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// The project configuration override rendered as JSON text, if any.
    pub fn tsconfig_text(&self) -> Option<String> {
        self.tsconfig.as_ref().map(|value| value.to_string())
    }
}

/// Options for the secondary source transform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Syntax target such as `"es2020"`; `None` keeps modern syntax as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// JSX runtime used when lowering JSX.
    #[serde(default)]
    pub jsx: JsxRuntime,
    /// Module that provides the automatic JSX runtime (e.g. `"preact"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsx_import_source: Option<String>,
    /// Use development variants of transforms (e.g. `jsxDEV`).
    #[serde(default)]
    pub development: bool,
}

/// JSX runtime selection for the secondary transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsxRuntime {
    /// `import { jsx } from "react/jsx-runtime"` style output.
    #[default]
    Automatic,
    /// `React.createElement` style output.
    Classic,
}

/// Whether the build driver keeps watching after its first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Build once, then keep rebuilding on file changes.
    Watch,
    /// Build once and stop watching.
    OneShot,
}

impl BuildMode {
    /// Reads the production-mode signal from [`MODE_ENV_VAR`].
    pub fn from_env() -> Self {
        Self::from_node_env(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }

    /// `OneShot` exactly when the value is `"production"`.
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value {
            Some("production") => BuildMode::OneShot,
            _ => BuildMode::Watch,
        }
    }
}

/// The subset of `tsconfig.json` that drives the build engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Compiler options.
    #[serde(default)]
    pub compiler_options: CompilerOptions,
    /// Path patterns of inputs. Empty means the whole project.
    #[serde(default)]
    pub include: Vec<String>,
    /// Path patterns to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Compiler options read from `compilerOptions`. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Requested incremental mode. The engine is always incremental.
    #[serde(default)]
    pub incremental: Option<bool>,
    /// JSX mode: `preserve`, `react`, `react-jsx` or `react-jsxdev`.
    #[serde(default)]
    pub jsx: Option<String>,
    /// Module providing the automatic JSX runtime.
    #[serde(default)]
    pub jsx_import_source: Option<String>,
    /// Requested build-info location. The engine always uses its own.
    #[serde(default)]
    pub ts_build_info_file: Option<String>,
}

impl ProjectConfig {
    /// Directory prefixes (project-relative, `/`-separated) that hold inputs.
    ///
    /// Glob tails such as `src/**/*` are reduced to their directory prefix;
    /// an empty `include` list yields the project root (`""`).
    pub fn include_roots(&self) -> Vec<String> {
        if self.include.is_empty() {
            return vec![String::new()];
        }
        self.include.iter().map(|p| pattern_prefix(p)).collect()
    }

    /// Returns `true` if a project-relative path is excluded from the build.
    ///
    /// `node_modules` is always excluded.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        if rel_path.split('/').any(|seg| seg == "node_modules") {
            return true;
        }
        self.exclude.iter().any(|pattern| {
            let prefix = pattern_prefix(pattern);
            !prefix.is_empty() && (rel_path == prefix || rel_path.starts_with(&format!("{prefix}/")))
        })
    }

    /// How the build engine emits JSX. Unset or unknown modes use the
    /// automatic runtime.
    pub fn jsx_emit(&self) -> JsxEmit {
        match self.compiler_options.jsx.as_deref() {
            Some("preserve") => JsxEmit::Preserve,
            Some("react") => JsxEmit::Classic,
            Some("react-jsxdev") => JsxEmit::Automatic { development: true },
            _ => JsxEmit::Automatic { development: false },
        }
    }

    /// Returns `true` when JSX should be kept as-is in emitted files.
    pub fn preserve_jsx(&self) -> bool {
        self.jsx_emit() == JsxEmit::Preserve
    }
}

/// JSX emit mode derived from `compilerOptions.jsx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsxEmit {
    /// Keep JSX in the output and emit `.jsx` files.
    Preserve,
    /// `React.createElement` calls (`"react"`).
    Classic,
    /// `jsx()` calls from the runtime module (`"react-jsx"`, `"react-jsxdev"`).
    Automatic {
        /// Use `jsxDEV` with source locations.
        development: bool,
    },
}

/// Reduces a path pattern to the directory prefix before its first glob segment.
fn pattern_prefix(pattern: &str) -> String {
    let trimmed = pattern.trim_start_matches("./");
    trimmed
        .split('/')
        .take_while(|seg| !seg.contains('*') && !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}
