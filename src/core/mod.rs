//! Core types shared across xhtpress
//!
//! - [`error`] - site-level error enum, user-facing error context
//! - [`file_error`] - file operation errors with path and purpose attached

pub mod error;
pub mod file_error;

pub use error::{ErrorContext, XhtError, user_friendly_error};
pub use file_error::{FileOperation, FileOperationError, FileResultExt};
