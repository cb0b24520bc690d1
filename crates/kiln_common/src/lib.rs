//! Shared foundational types used across the kiln dev server.
//!
//! This crate provides content hashing for cache fingerprints and incremental
//! builds.

#![warn(missing_docs)]

pub mod hash;

pub use hash::ContentHash;
