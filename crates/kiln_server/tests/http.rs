//! HTTP-level tests for the kiln dev server.
//!
//! Each test builds an isolated project and snapshot directory and drives
//! the router in-process with `tower::ServiceExt::oneshot`.

use std::io;
use std::path::Path;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use kiln_build::{DriverState, Reporter};
use kiln_config::{BuildMode, ServerOptions};
use kiln_server::DevServer;
use tempfile::TempDir;
use tower::ServiceExt;

const INLINE_MAP: &str = "//# sourceMappingURL=data:application/json;charset=utf-8;base64,";

const MODULE_TEST_SOURCE: &str = "import { expect, test } from \"@jest/globals\";\n\ntest(\"test\", () => {\n  expect(true).toBeTruthy();\n});\n";

// ── Fixtures ───────────────────────────────────────────────────

struct Fixture {
    project: TempDir,
    snapshots: TempDir,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let project = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = project.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        Self {
            project,
            snapshots: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.project.path()
    }

    fn options(&self) -> ServerOptions {
        ServerOptions {
            cache_dir: Some(self.snapshots.path().to_path_buf()),
            ..ServerOptions::default()
        }
    }

    fn start(&self, options: ServerOptions, mode: BuildMode) -> DevServer {
        DevServer::start(self.root(), options, mode, Reporter::new(io::sink(), false)).unwrap()
    }
}

fn incremental_tsconfig() -> serde_json::Value {
    serde_json::json!({
        "compilerOptions": {
            "incremental": true,
            "target": "ES2020",
            "module": "ES2020",
            "strict": true,
            "tsBuildInfoFile": "tsconfig.tsbuildinfo"
        },
        "include": ["src"]
    })
}

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

async fn get(server: &DevServer, uri: &str) -> Reply {
    let response = server
        .router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        content_type,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

// ── Cache hits ─────────────────────────────────────────────────

#[tokio::test]
async fn cache_hit_is_served_verbatim_without_disk() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);
    server.cache().insert("ghost/never-on-disk.ts", "cached();\n");
    server.cache().insert("ghost/notes.txt", "plain");

    let reply = get(&server, "/ghost/never-on-disk.ts").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "cached();\n");
    assert_eq!(
        reply.content_type.as_deref(),
        Some("application/javascript;charset=UTF-8")
    );

    let reply = get(&server, "/ghost/notes.txt").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "plain");
    assert_eq!(reply.content_type, None);
}

// ── Script fallback ────────────────────────────────────────────

#[tokio::test]
async fn unbuilt_script_is_transformed_then_cached() {
    let fixture = Fixture::new(&[
        ("tsconfig.json", r#"{ "include": ["src"] }"#),
        ("vendor/util.js", "export const twice = (n) => n * 2;\n"),
    ]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);
    assert!(!server.cache().contains("vendor/util.js"));

    let first = get(&server, "/vendor/util.js").await;
    assert_eq!(first.status, StatusCode::OK);
    assert!(first.body.contains("export const twice = (n) => n * 2;"));
    assert!(first.body.contains(INLINE_MAP));
    assert_eq!(server.cache().get("vendor/util.js").as_deref(), Some(first.body.as_str()));

    // Served from the cache from now on, even if the file changes.
    std::fs::write(fixture.root().join("vendor/util.js"), "export {};\n").unwrap();
    let second = get(&server, "/vendor/util.js").await;
    assert_eq!(second.body, first.body);
}

#[tokio::test]
async fn typescript_outside_the_build_is_stripped_on_demand() {
    let fixture = Fixture::new(&[
        ("tsconfig.json", r#"{ "include": ["src"] }"#),
        ("scripts/seed.ts", "export const count: number = 3;\n"),
    ]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);

    let reply = get(&server, "/scripts/seed.ts").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("export const count = 3;"));
}

#[tokio::test]
async fn missing_script_is_404_with_empty_body() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);

    let reply = get(&server, "/src/missing.ts").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "");
    assert_eq!(
        reply.content_type.as_deref(),
        Some("application/javascript;charset=UTF-8")
    );
    assert!(!server.cache().contains("src/missing.ts"));
}

// ── Raw files ──────────────────────────────────────────────────

#[tokio::test]
async fn other_files_are_streamed_with_content_type() {
    let fixture = Fixture::new(&[
        ("tsconfig.json", "{}"),
        ("index.html", "<!doctype html><script type=module src=/src/main.ts></script>"),
        ("data/config.json", "{\"debug\":true}"),
        ("assets/logo.svg", "<svg/>"),
    ]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);

    let html = get(&server, "/index.html").await;
    assert_eq!(html.status, StatusCode::OK);
    assert_eq!(html.content_type.as_deref(), Some("text/html;charset=UTF-8"));
    assert!(html.body.starts_with("<!doctype html>"));

    let json = get(&server, "/data/config.json").await;
    assert_eq!(json.content_type.as_deref(), Some("application/json;charset=UTF-8"));
    assert_eq!(json.body, "{\"debug\":true}");

    let svg = get(&server, "/assets/logo.svg").await;
    assert_eq!(svg.status, StatusCode::OK);
    assert_eq!(svg.content_type, None);
    assert_eq!(svg.body, "<svg/>");

    // Raw files are never cached.
    assert!(!server.cache().contains("index.html"));
}

#[tokio::test]
async fn missing_file_is_404_with_empty_body() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);

    let reply = get(&server, "/styles/missing.css").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, "");
    assert_eq!(reply.content_type, None);
}

#[tokio::test]
async fn directory_is_404() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}"), ("public/a.txt", "a")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);

    assert_eq!(get(&server, "/public").await.status, StatusCode::NOT_FOUND);
    assert_eq!(get(&server, "/").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn query_string_is_ignored() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}"), ("index.html", "<p>hi</p>")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);

    let reply = get(&server, "/index.html?v=42#top").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "<p>hi</p>");
}

// ── Build integration and persistence ──────────────────────────

#[tokio::test]
async fn built_test_module_is_served_and_survives_restart() {
    let fixture = Fixture::new(&[
        ("package.json", "{\"name\":\"app\",\"version\":\"1.0.0\"}"),
        ("src/module.test.ts", MODULE_TEST_SOURCE),
    ]);
    let options = ServerOptions {
        tsconfig: Some(incremental_tsconfig()),
        ..fixture.options()
    };

    let server = fixture.start(options.clone(), BuildMode::OneShot);
    assert!(server.cache().contains("src/module.test.ts"));
    assert!(server.cache().contains("tsconfig.tsbuildinfo"));

    let reply = get(&server, "/src/module.test.ts").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("import { expect, test } from \"@jest/globals\";"));
    assert!(reply.body.contains("expect(true).toBeTruthy();"));
    assert!(reply.body.contains(INLINE_MAP));

    let snapshot = server.snapshot_path().to_path_buf();
    assert_eq!(server.shutdown(), 0);
    assert!(snapshot.exists());
    assert!(snapshot.starts_with(fixture.snapshots.path()));

    let restarted = fixture.start(options, BuildMode::OneShot);
    assert_eq!(restarted.snapshot_path(), snapshot);
    assert_eq!(
        restarted.cache().get("src/module.test.ts").as_deref(),
        Some(reply.body.as_str())
    );
    let again = get(&restarted, "/src/module.test.ts").await;
    assert_eq!(again.body, reply.body);
}

#[tokio::test]
async fn restart_with_same_options_restores_cache() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);
    server.cache().insert("ghost.ts", "kept");
    server.shutdown();

    let restarted = fixture.start(fixture.options(), BuildMode::OneShot);
    assert_eq!(restarted.cache().get("ghost.ts").as_deref(), Some("kept"));
}

#[tokio::test]
async fn changed_options_start_with_empty_cache() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);
    server.cache().insert("ghost.ts", "stale");
    let old_snapshot = server.snapshot_path().to_path_buf();
    server.shutdown();

    let changed = ServerOptions {
        port: Some(3000),
        ..fixture.options()
    };
    let restarted = fixture.start(changed, BuildMode::OneShot);
    assert_ne!(restarted.snapshot_path(), old_snapshot);
    assert!(old_snapshot.exists());
    assert!(!restarted.cache().contains("ghost.ts"));
}

#[tokio::test]
async fn changed_manifest_starts_with_empty_cache() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}"), ("package.json", "{\"version\":\"1\"}")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);
    server.cache().insert("ghost.ts", "stale");
    server.shutdown();

    std::fs::write(fixture.root().join("package.json"), "{\"version\":\"2\"}").unwrap();
    let restarted = fixture.start(fixture.options(), BuildMode::OneShot);
    assert!(!restarted.cache().contains("ghost.ts"));
}

#[tokio::test]
async fn corrupt_snapshot_is_ignored() {
    let fixture = Fixture::new(&[("tsconfig.json", "{}")]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);
    let snapshot = server.snapshot_path().to_path_buf();
    server.shutdown();
    std::fs::write(&snapshot, "{ truncated").unwrap();

    let restarted = fixture.start(fixture.options(), BuildMode::OneShot);
    assert_eq!(get(&restarted, "/ghost.ts").await.status, StatusCode::NOT_FOUND);
}

// ── Failure indicator and lifecycle ────────────────────────────

#[tokio::test]
async fn one_shot_errors_set_exit_code() {
    let fixture = Fixture::new(&[
        ("tsconfig.json", "{}"),
        ("src/broken.ts", "export const = ;\n"),
    ]);
    let server = fixture.start(fixture.options(), BuildMode::OneShot);
    assert_eq!(server.driver_state(), DriverState::OneShot);
    assert!(server.status().has_failed());
    assert!(!server.cache().contains("src/broken.ts"));
    assert_eq!(server.shutdown(), 1);
}

#[tokio::test]
async fn watch_mode_survives_errors_until_closed() {
    let fixture = Fixture::new(&[
        ("tsconfig.json", "{}"),
        ("src/broken.ts", "export const = ;\n"),
        ("src/ok.ts", "export const ok = 1;\n"),
    ]);
    let server = fixture.start(fixture.options(), BuildMode::Watch);
    assert_eq!(server.driver_state(), DriverState::Watching);
    assert!(server.status().has_failed());
    assert!(server.cache().contains("src/ok.ts"));

    server.close();
    assert_eq!(server.driver_state(), DriverState::Closed);
    server.close();
    assert_eq!(server.driver_state(), DriverState::Closed);
}

#[tokio::test]
async fn watch_mode_serves_fixed_source_after_error() {
    let fixture = Fixture::new(&[
        ("tsconfig.json", "{}"),
        ("src/broken.ts", "export const = ;\n"),
    ]);
    let server = fixture.start(fixture.options(), BuildMode::Watch);
    assert!(server.status().has_failed());
    assert!(!server.cache().contains("src/broken.ts"));

    std::fs::write(
        server.root().join("src/broken.ts"),
        "export const repaired: string = \"yes\";\n",
    )
    .unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while !server.cache().contains("src/broken.ts") {
        assert!(std::time::Instant::now() < deadline, "no rebuild after fixing the error");
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    assert_eq!(server.driver_state(), DriverState::Watching);

    let reply = get(&server, "/src/broken.ts").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("export const repaired = \"yes\";"));
    server.close();
}

#[tokio::test]
async fn watch_mode_rebuilds_changed_sources() {
    let fixture = Fixture::new(&[
        ("tsconfig.json", "{}"),
        ("src/value.ts", "export const value: number = 1;\n"),
    ]);
    let server = fixture.start(fixture.options(), BuildMode::Watch);
    assert!(server.cache().get("src/value.ts").unwrap().contains("value = 1"));

    std::fs::write(
        server.root().join("src/value.ts"),
        "export const value: number = 2;\n",
    )
    .unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while !server
        .cache()
        .get("src/value.ts")
        .is_some_and(|code| code.contains("value = 2"))
    {
        assert!(std::time::Instant::now() < deadline, "no rebuild after change");
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    server.close();
}

#[tokio::test]
async fn missing_root_is_an_error() {
    let missing = tempfile::tempdir().unwrap().path().join("nope");
    let result = DevServer::start(
        &missing,
        ServerOptions::default(),
        BuildMode::OneShot,
        Reporter::new(io::sink(), false),
    );
    assert!(matches!(result, Err(kiln_server::ServerError::Root { .. })));
}
