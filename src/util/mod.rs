//! Utility types shared by every layer of the crate.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
