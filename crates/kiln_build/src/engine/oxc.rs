//! Incremental TypeScript compilation with the oxc toolchain.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use kiln_cache::BUILD_INFO_KEY;
use kiln_common::ContentHash;
use kiln_config::{parse_project_config, JsxEmit, ProjectConfig, PROJECT_CONFIG_FILE};
use kiln_diagnostics::{Category, Diagnostic, DiagnosticCode, FileId, Span};
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_diagnostics::OxcDiagnostic;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{JsxRuntime, TransformOptions, Transformer};
use walkdir::WalkDir;

use super::build_info::BuildInfo;
use super::{BuildEngine, BuildOutput};
use crate::fs::FileSystem;
use crate::paths::{emit_path, is_build_input, is_ignored_dir, relative_path};

const CONFIG_READ: DiagnosticCode = DiagnosticCode::new(Category::Config, 1);
const CONFIG_PARSE: DiagnosticCode = DiagnosticCode::new(Category::Config, 2);
const SYNTAX_ERROR: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 1);
const SEMANTIC_ERROR: DiagnosticCode = DiagnosticCode::new(Category::Semantic, 1);
const TRANSFORM_ERROR: DiagnosticCode = DiagnosticCode::new(Category::Transform, 1);

/// Compiles `.ts`/`.tsx` inputs to JavaScript, one file at a time.
///
/// The engine always runs incrementally: its state lives in the build-info
/// file at the project root, read and written through the file system it is
/// given. Inputs with errors are not emitted and stay dirty until they
/// compile. Any change to the project configuration text makes every input
/// dirty.
pub struct OxcEngine {
    root: PathBuf,
}

/// A compile failure before it is attached to a source file.
struct CompileError {
    code: DiagnosticCode,
    message: String,
    range: Option<(usize, usize)>,
}

impl OxcEngine {
    /// Creates an engine for the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn load_config(&self, fs: &dyn FileSystem) -> Result<(ProjectConfig, ContentHash), Diagnostic> {
        let path = self.root.join(PROJECT_CONFIG_FILE);
        let text = fs.read_to_string(&path).map_err(|e| {
            Diagnostic::error(
                CONFIG_READ,
                format!("cannot read {PROJECT_CONFIG_FILE}: {e}"),
                Span::DUMMY,
            )
            .with_help("create a tsconfig.json in the project root or set `tsconfig` in kiln.toml")
        })?;
        let config = parse_project_config(&text).map_err(|e| {
            Diagnostic::error(
                CONFIG_PARSE,
                format!("invalid {PROJECT_CONFIG_FILE}: {e}"),
                Span::DUMMY,
            )
        })?;
        Ok((config, ContentHash::from_bytes(text.as_bytes())))
    }

    fn load_build_info(&self, fs: &dyn FileSystem) -> BuildInfo {
        fs.read_to_string(&self.root.join(BUILD_INFO_KEY))
            .ok()
            .and_then(|text| BuildInfo::parse(&text))
            .unwrap_or_default()
    }

    /// Every build input under the configured include roots, sorted.
    fn discover_inputs(&self, config: &ProjectConfig) -> BTreeSet<PathBuf> {
        let mut inputs = BTreeSet::new();
        for include in config.include_roots() {
            let base = if include.is_empty() {
                self.root.clone()
            } else {
                self.root.join(&include)
            };
            let walker = WalkDir::new(&base).into_iter().filter_entry(|entry| {
                entry.depth() == 0
                    || !entry.file_type().is_dir()
                    || !entry.file_name().to_str().is_some_and(is_ignored_dir)
            });
            for entry in walker.filter_map(Result::ok) {
                if !entry.file_type().is_file() || !is_build_input(entry.path()) {
                    continue;
                }
                let rel = relative_path(&self.root, entry.path());
                if !config.is_excluded(&rel) {
                    inputs.insert(entry.into_path());
                }
            }
        }
        inputs
    }
}

impl BuildEngine for OxcEngine {
    fn build(&mut self, fs: &dyn FileSystem, changed: &[PathBuf]) -> BuildOutput {
        let mut output = BuildOutput::default();

        let (config, config_hash) = match self.load_config(fs) {
            Ok(loaded) => loaded,
            Err(diag) => {
                output.diagnostics.push(diag);
                return output;
            }
        };
        let preserve_jsx = config.preserve_jsx();
        let options = transform_options(&config);
        let previous = self.load_build_info(fs).under_config(config_hash);

        let mut sources = BTreeMap::new();
        let mut hashes = BTreeMap::new();
        for path in self.discover_inputs(&config) {
            // Unreadable inputs drop out and are treated as deleted.
            let Ok(text) = fs.read_to_string(&path) else {
                continue;
            };
            let rel = relative_path(&self.root, &path);
            hashes.insert(rel.clone(), ContentHash::from_bytes(text.as_bytes()));
            sources.insert(rel, (path, text));
        }

        let changes = previous.detect_changes(&hashes);
        let hinted: HashSet<String> = changed
            .iter()
            .map(|path| relative_path(&self.root, path))
            .collect();
        tracing::debug!(
            new = changes.new_files.len(),
            modified = changes.modified_files.len(),
            deleted = changes.deleted_files.len(),
            hinted = hinted.len(),
            "build pass"
        );

        let mut next = BuildInfo::for_config(config_hash);
        for (rel, (path, text)) in sources {
            let hash = hashes[&rel];
            let dirty = previous.files.get(&rel) != Some(&hash) || hinted.contains(&rel);
            if !dirty {
                next.files.insert(rel, hash);
                continue;
            }
            match compile(&path, &text, &options) {
                Ok(code) => {
                    output.emitted.push((emit_path(&path, preserve_jsx), code));
                    next.files.insert(rel, hash);
                }
                Err(errors) => {
                    let file = output.sources.add_source(rel, text);
                    output
                        .diagnostics
                        .extend(errors.into_iter().map(|e| e.into_diagnostic(file)));
                }
            }
        }

        output
            .emitted
            .push((self.root.join(BUILD_INFO_KEY), next.to_json()));
        output
    }
}

impl CompileError {
    fn from_oxc(code: DiagnosticCode, err: &OxcDiagnostic) -> Self {
        let range = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| (label.offset(), label.offset() + label.len()));
        Self {
            code,
            message: err.to_string(),
            range,
        }
    }

    fn into_diagnostic(self, file: FileId) -> Diagnostic {
        let (start, end) = self.range.unwrap_or((0, 0));
        Diagnostic::error(
            self.code,
            self.message,
            Span::new(file, start as u32, end as u32),
        )
    }
}

/// Lowering options for the project's JSX mode.
fn transform_options(config: &ProjectConfig) -> TransformOptions {
    let mut options = TransformOptions::default();
    match config.jsx_emit() {
        JsxEmit::Preserve => options.jsx.jsx_plugin = false,
        JsxEmit::Classic => options.jsx.runtime = JsxRuntime::Classic,
        JsxEmit::Automatic { development } => {
            options.jsx.runtime = JsxRuntime::Automatic;
            options.jsx.development = development;
        }
    }
    if let Some(source) = &config.compiler_options.jsx_import_source {
        options.jsx.import_source = Some(source.clone());
    }
    options
}

/// Parses, checks and lowers one file. Type annotations are stripped and JSX
/// is handled as `options` says.
fn compile(
    path: &Path,
    source: &str,
    options: &TransformOptions,
) -> Result<String, Vec<CompileError>> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::ts());

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if !parsed.errors.is_empty() {
        return Err(tag(SYNTAX_ERROR, &parsed.errors));
    }
    let mut program = parsed.program;

    let checked = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&program);
    if !checked.errors.is_empty() {
        return Err(tag(SEMANTIC_ERROR, &checked.errors));
    }
    let scoping = checked.semantic.into_scoping();

    let transformed =
        Transformer::new(&allocator, path, options).build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(tag(TRANSFORM_ERROR, &transformed.errors));
    }

    Ok(Codegen::new().build(&program).code)
}

fn tag(code: DiagnosticCode, errors: &[OxcDiagnostic]) -> Vec<CompileError> {
    errors.iter().map(|e| CompileError::from_oxc(code, e)).collect()
}
