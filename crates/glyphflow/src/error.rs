#![forbid(unsafe_code)]

//! Recoverable layout errors.
//!
//! Only edits addressed at a line that does not exist, removals that remove
//! nothing, and invalid configuration values are reported through
//! [`LayoutError`]. Malformed ranges and misaligned offsets are caller bugs
//! and panic.

use thiserror::Error;

use crate::location::TextLocation;

pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("line index {index} out of range (line count {line_count})")]
    InvalidLine { index: usize, line_count: usize },

    #[error("nothing to remove at {location}")]
    EmptyRemoval { location: TextLocation },

    #[error("invalid layout configuration: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f32 },
}

impl LayoutError {
    #[must_use]
    pub fn invalid_line(index: usize, line_count: usize) -> Self {
        Self::InvalidLine { index, line_count }
    }

    #[must_use]
    pub fn invalid_config(field: &'static str, value: f32) -> Self {
        Self::InvalidConfig { field, value }
    }
}
