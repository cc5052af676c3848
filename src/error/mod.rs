//! Error types

pub mod types;

pub use types::{ConfigWarning, RouterError};
