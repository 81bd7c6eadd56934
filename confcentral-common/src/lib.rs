//! # Conference Central Common Library
//!
//! Shared code for the Conference Central services including:
//! - Database records, schema and row mapping
//! - Transaction contention retry
//! - Configuration loading
//! - Record key utilities

pub mod config;
pub mod db;
pub mod error;
pub mod keys;

pub use error::{Error, Result};
