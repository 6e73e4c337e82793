//! Shared types for casework

pub mod error;

pub use error::{CaseworkError, Result};
