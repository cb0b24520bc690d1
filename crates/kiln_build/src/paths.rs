//! Path conventions shared by the engine, the file-system adapter and the
//! watch session.

use std::path::{Component, Path};

/// Extensions the engine compiles.
const INPUT_EXTENSIONS: &[&str] = &["ts", "tsx"];

/// Directory names never compiled or watched.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

/// Renders `path` relative to `root` with `/` separators.
///
/// Paths outside `root` are rendered as given.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<_> = rel
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => None,
        })
        .collect();
    let joined = parts.join("/");
    if rel.has_root() {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Artifact cache key for a file the engine emitted.
///
/// Strips the project root and maps a trailing `.js`/`.jsx` back to
/// `.ts`/`.tsx`, so compiled output is found under the source path a client
/// requests.
pub fn artifact_key(root: &Path, emitted: &Path) -> String {
    let rel = relative_path(root, emitted);
    if let Some(stem) = rel.strip_suffix(".jsx") {
        format!("{stem}.tsx")
    } else if let Some(stem) = rel.strip_suffix(".js") {
        format!("{stem}.ts")
    } else {
        rel
    }
}

/// Returns `true` for `.ts`/`.tsx` sources, excluding declaration files.
pub fn is_build_input(path: &Path) -> bool {
    let is_input_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| INPUT_EXTENSIONS.contains(&ext));
    let is_declaration = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(".d.ts"));
    is_input_ext && !is_declaration
}

/// Returns `true` if a directory name is never descended into.
pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// Returns `true` if a file event at `path` should trigger a rebuild.
///
/// Only build inputs and the project configuration under `root` count, and
/// nothing inside an ignored directory.
pub fn is_watch_relevant(root: &Path, path: &Path) -> bool {
    let Ok(rel) = path.strip_prefix(root) else {
        return false;
    };
    let in_ignored_dir = rel
        .components()
        .any(|c| matches!(c, Component::Normal(part) if part.to_str().is_some_and(is_ignored_dir)));
    if in_ignored_dir {
        return false;
    }
    is_build_input(rel) || rel == Path::new(kiln_config::PROJECT_CONFIG_FILE)
}

/// Output path for a compiled input: `.ts` → `.js`, `.tsx` → `.jsx` when JSX
/// is preserved, otherwise `.js`.
pub fn emit_path(input: &Path, preserve_jsx: bool) -> std::path::PathBuf {
    let is_tsx = input.extension().is_some_and(|ext| ext == "tsx");
    let ext = if is_tsx && preserve_jsx { "jsx" } else { "js" };
    input.with_extension(ext)
}
