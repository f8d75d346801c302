//! Prism Core - Domain models, error taxonomy, and configuration
//!
//! This crate contains the canonical feature and geometry models shared by
//! the prism spatial proximity store.

pub mod config;
pub mod error;
pub mod models;

pub use error::{PrismError, Result};
