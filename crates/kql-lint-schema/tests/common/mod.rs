//! Shared test utilities for the schema loaders
//!
//! - `MockAdminClient`: scripted control-command results per cluster
//! - `MemoryLoader`: an in-memory `SymbolLoader` that records every call
//! - fixtures for the `help` cluster and its `Samples` database

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;
