//! Core types and trait definitions for the Tessera content platform.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod analytics;
pub mod chat;
pub mod color;
pub mod error;
pub mod intel;
pub mod item;
pub mod media;
pub mod naming;
pub mod page;
pub mod section;
pub mod session;
pub mod status;
pub mod store;
pub mod theme;

pub use error::{Error, Result};
