//! Foundational data structures, metadata and error types.

pub mod error;
pub mod metadata;
pub mod models;
