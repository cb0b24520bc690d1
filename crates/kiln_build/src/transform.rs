//! The secondary source transform applied to every served script.

use std::path::Path;
use std::sync::Arc;

use kiln_config::{JsxRuntime, TransformConfig};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};

const SOURCE_MAP_COMMENT: &str = "//# sourceMappingURL=";

/// Why a transform produced no output. Only logged.
#[derive(Debug, thiserror::Error)]
enum TransformFailure {
    #[error("unsupported file type: {0}")]
    SourceType(String),
    #[error("invalid transform options: {0}")]
    Options(String),
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("transform failed: {0}")]
    Transform(String),
}

/// Turns `(path, source)` into final served text with an inline source map.
///
/// Pure with respect to its inputs and the [`TransformConfig`] captured at
/// construction. Cloning is cheap.
#[derive(Clone, Debug, Default)]
pub struct Pipeline {
    config: Arc<TransformConfig>,
}

impl Pipeline {
    /// Creates a pipeline using `config` for every call.
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Transforms `source`, using `path` as its identity in the source map.
    ///
    /// Any failure yields an empty string rather than an error.
    pub fn transform(&self, path: &str, source: &str) -> String {
        match self.try_transform(path, source) {
            Ok(code) => code,
            Err(failure) => {
                tracing::debug!(path, "{failure}");
                String::new()
            }
        }
    }

    fn try_transform(&self, path: &str, source: &str) -> Result<String, TransformFailure> {
        let file_path = Path::new(path);
        let source_type = SourceType::from_path(file_path)
            .map_err(|e| TransformFailure::SourceType(e.to_string()))?;
        let options = self.transform_options()?;

        let allocator = Allocator::default();
        let parsed = Parser::new(&allocator, source, source_type).parse();
        if let Some(err) = parsed.errors.first() {
            return Err(TransformFailure::Parse(err.to_string()));
        }
        let mut program = parsed.program;

        let scoping = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_scoping();
        let transformed = Transformer::new(&allocator, file_path, &options)
            .build_with_scoping(scoping, &mut program);
        if let Some(err) = transformed.errors.first() {
            return Err(TransformFailure::Transform(err.to_string()));
        }

        let generated = Codegen::new()
            .with_options(CodegenOptions {
                source_map_path: Some(file_path.to_path_buf()),
                ..CodegenOptions::default()
            })
            .build(&program);

        let mut code = generated.code;
        if let Some(map) = generated.map {
            if !code.ends_with('\n') {
                code.push('\n');
            }
            code.push_str(SOURCE_MAP_COMMENT);
            code.push_str(&map.to_data_url());
        }
        Ok(code)
    }

    fn transform_options(&self) -> Result<TransformOptions, TransformFailure> {
        let mut options = match &self.config.target {
            Some(target) => TransformOptions::from_target(target)
                .map_err(|e| TransformFailure::Options(e.to_string()))?,
            None => TransformOptions::default(),
        };
        options.jsx.runtime = match self.config.jsx {
            JsxRuntime::Automatic => oxc_transformer::JsxRuntime::Automatic,
            JsxRuntime::Classic => oxc_transformer::JsxRuntime::Classic,
        };
        options.jsx.development = self.config.development;
        if let Some(source) = &self.config.jsx_import_source {
            options.jsx.import_source = Some(source.clone());
        }
        Ok(options)
    }
}
