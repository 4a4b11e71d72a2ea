#![deny(unused)]
//! Core types, traits, and error definitions for Taskforge.
//!
//! This crate provides the foundational building blocks shared across the
//! engine, store, and model-gateway crates.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;

/// Get the current timestamp in unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
