//! # Tally Core
//!
//! Core types and error definitions for the Tally transaction service.
//! This crate provides the unified error taxonomy and result alias used
//! across all layers of the workspace.

pub mod error;
pub mod result;

pub use error::*;
pub use result::*;
