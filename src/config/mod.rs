//! # LarkDB Configuration Module
//!
//! This module centralizes all configuration constants for LarkDB. The page
//! geometry constants are interdependent (node capacities are derived from
//! the page size), so they live in one place and their relationships are
//! enforced through compile-time assertions.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
