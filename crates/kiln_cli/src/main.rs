//! Kiln CLI: serves a TypeScript project with incremental builds.
//!
//! `kiln` starts one dev server for the project root, keeps rebuilding on
//! file changes (unless `--once` or `NODE_ENV=production`), and exits with
//! status `1` if any build pass reported errors.

#![warn(missing_docs)]

use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use kiln_build::Reporter;
use kiln_config::{load_options, BuildMode, ServerOptions};
use kiln_server::DevServer;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Kiln: a TypeScript dev server with incremental builds.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln TypeScript dev server")]
pub struct Cli {
    /// Project root to serve and build.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Listen port (overrides `kiln.toml`).
    #[arg(short, long, env = "KILN_PORT")]
    pub port: Option<u16>,

    /// Build once and stop watching for changes.
    #[arg(long)]
    pub once: bool,

    /// Suppress all output except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Control colored diagnostics.
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

impl Cli {
    /// Default log directive when `RUST_LOG` is unset.
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Build mode: `--once` wins, otherwise the production-mode signal.
    fn mode(&self) -> BuildMode {
        if self.once {
            BuildMode::OneShot
        } else {
            BuildMode::from_env()
        }
    }

    /// Applies flag overrides on top of options loaded from `kiln.toml`.
    fn apply(&self, mut options: ServerOptions) -> ServerOptions {
        if let Some(port) = self.port {
            options.port = Some(port);
        }
        options
    }
}

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

async fn run(cli: Cli) -> Result<i32, Box<dyn Error>> {
    let options = cli.apply(load_options(&cli.root)?);
    let addr = options.listen_addr();

    let server = DevServer::start(
        &cli.root,
        options,
        cli.mode(),
        Reporter::stderr(cli.color.enabled()),
    )?;

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            server.close();
            return Err(format!("cannot listen on {addr}: {e}").into());
        }
    };

    server.serve(listener, shutdown_signal()).await?;
    Ok(server.shutdown())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
