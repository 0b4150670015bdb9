//! Shared test utilities for signoff integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a `RequestService` to inspectable collaborators
//! - `ScriptedSigner` and `FlakyStore` for failure injection
//! - Builders for uploads and templates

pub mod builders;
pub mod harness;
pub mod signer;

pub use builders::*;
pub use harness::{drain_events, FlakyStore, TestHarness};
pub use signer::ScriptedSigner;
