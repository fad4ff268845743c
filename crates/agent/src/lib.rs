//! `loadshield-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod cloudflare;
pub mod config;
pub mod controller;
pub mod marker_store;
pub mod sampler;
