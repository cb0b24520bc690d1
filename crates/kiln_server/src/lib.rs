//! The kiln HTTP surface: one catch-all route backed by the artifact cache.
//!
//! [`DevServer`] owns every resource of one server instance (artifact
//! cache, snapshot store, build driver) and exposes the axum [`Router`]
//! that serves them. Instances share no global state, so several can run in
//! one process.
//!
//! [`Router`]: axum::Router

#![warn(missing_docs)]

pub mod error;
pub mod handler;
pub mod server;
pub mod state;

pub use error::ServerError;
pub use handler::{handle, ContentKind};
pub use server::DevServer;
pub use state::AppState;
