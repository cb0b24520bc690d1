//! The catch-all request handler.
//!
//! Resolution order for a request path:
//! 1. artifact cache hit, served verbatim;
//! 2. script extensions: read from disk, transform, cache, serve;
//! 3. anything else: stream the file from disk.
//!
//! Every failure is a 404 with an empty body.

use std::path::Path;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use tokio_util::io::ReaderStream;

use crate::state::AppState;

/// Response classification by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// `.js`, `.jsx`, `.mjs`, `.ts`, `.tsx`: transformed on demand.
    Script,
    /// `.json`
    Json,
    /// `.html`
    Html,
    /// Anything else. No content type is sent.
    Other,
}

impl ContentKind {
    /// Classifies a request path by its extension.
    pub fn from_path(path: &str) -> Self {
        match Path::new(path).extension().and_then(|ext| ext.to_str()) {
            Some("js" | "jsx" | "mjs" | "ts" | "tsx") => ContentKind::Script,
            Some("json") => ContentKind::Json,
            Some("html") => ContentKind::Html,
            _ => ContentKind::Other,
        }
    }

    /// The `Content-Type` header value, if one is sent.
    pub fn content_type(self) -> Option<&'static str> {
        match self {
            ContentKind::Script => Some("application/javascript;charset=UTF-8"),
            ContentKind::Json => Some("application/json;charset=UTF-8"),
            ContentKind::Html => Some("text/html;charset=UTF-8"),
            ContentKind::Other => None,
        }
    }

    /// Returns `true` for paths served through the transform pipeline.
    pub fn is_script(self) -> bool {
        self == ContentKind::Script
    }
}

/// Serves any path. The query string is ignored and the path is not
/// percent-decoded or sanitized.
pub async fn handle(State(state): State<AppState>, uri: Uri) -> Response {
    let rel = uri.path().strip_prefix('/').unwrap_or(uri.path());
    let kind = ContentKind::from_path(rel);

    let mut response = resolve(&state, rel, kind).await;
    if let Some(content_type) = kind.content_type() {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

async fn resolve(state: &AppState, rel: &str, kind: ContentKind) -> Response {
    if let Some(artifact) = state.cache.get(rel) {
        return Response::new(Body::from(artifact));
    }

    let path = state.root.join(rel);

    if kind.is_script() {
        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!(path = rel, "script not readable: {e}");
                return not_found();
            }
        };
        let pipeline = state.pipeline.clone();
        let key = rel.to_string();
        let code = match tokio::task::spawn_blocking(move || pipeline.transform(&key, &source)).await
        {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(path = rel, "transform task failed: {e}");
                return not_found();
            }
        };
        state.cache.insert(rel, code.clone());
        return Response::new(Body::from(code));
    }

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(_) => return not_found(),
    };
    match file.metadata().await {
        Ok(meta) if meta.is_file() => Response::new(Body::from_stream(ReaderStream::new(file))),
        _ => not_found(),
    }
}

fn not_found() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
