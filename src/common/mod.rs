//! Common types and error definitions for tpspace_rrt
//!
//! This module provides the foundational building blocks used across
//! the PTG implementations and the planner.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
