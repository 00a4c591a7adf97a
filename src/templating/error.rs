//! Template engine errors.
//!
//! Only a handful of things can actually fail while rendering. Unresolvable scope
//! paths, unknown filters, unregistered widgets and malformed comparison operands
//! all degrade silently (the token stays in the output or the branch is omitted),
//! so they have no variant here.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::file_error::FileOperationError;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// A file-backed template (root or include) could not be read.
    #[error("Failed to load template '{}'", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: FileOperationError,
    },

    /// A dynamic include (`{% $path %}`) resolved to nothing usable.
    #[error("Dynamic include '${path}' in {template} did not resolve to a template name")]
    IncludeUnresolved {
        path: String,
        template: String,
    },

    /// Includes nested deeper than the engine allows, usually a cycle.
    #[error("Include depth exceeded {max} levels while rendering {template}")]
    IncludeDepth {
        max: usize,
        template: String,
    },

    /// A widget handler failed; the whole widget pass fails with it.
    #[error("Widget '{name}' failed")]
    Widget {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
