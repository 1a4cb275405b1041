//! Test fixtures and data generators
//!
//! This module contains builders for creating synthetic Blue File test data.

pub mod builders;

pub use builders::*;
