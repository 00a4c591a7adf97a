//! Error handling for xhtpress
//!
//! Two layers, mirroring how errors travel through the tool:
//! - [`XhtError`] enumerates site-level failures (configuration, content
//!   discovery, template references). Library code returns it (or the more specific
//!   [`TemplateError`](crate::templating::TemplateError)) wrapped in
//!   [`anyhow::Error`] with call-site context.
//! - [`ErrorContext`] decorates an error with a suggestion and details for the
//!   terminal. [`user_friendly_error`] turns any `anyhow::Error` produced by a
//!   command into one.
//!
//! ```rust,no_run
//! use xhtpress::core::{XhtError, user_friendly_error};
//!
//! let err = anyhow::Error::from(XhtError::ConfigNotFound {
//!     path: "xhtpress.toml".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use super::file_error::{FileOperation, FileOperationError};
use crate::cache::CacheError;
use crate::templating::TemplateError;

/// Site-level failures.
#[derive(Error, Debug, Clone)]
pub enum XhtError {
    /// The configuration file does not exist.
    #[error("Configuration file '{path}' not found")]
    ConfigNotFound {
        path: String,
    },

    /// The configuration file is not valid TOML or has wrong field types.
    #[error("Invalid configuration in '{file}': {reason}")]
    ConfigParseError {
        file: String,
        reason: String,
    },

    /// The configuration parsed but holds unusable values.
    #[error("Configuration validation failed: {reason}")]
    ConfigValidationError {
        reason: String,
    },

    /// The content directory is missing.
    #[error("Content directory '{path}' not found")]
    ContentDirNotFound {
        path: String,
    },

    /// A content file names a template through a non-string `page.template`.
    #[error("Content '{id}' has an invalid template reference: {reason}")]
    InvalidTemplateReference {
        id: String,
        reason: String,
    },
}

/// An error plus what the user can do about it.
#[derive(Debug)]
pub struct ErrorContext {
    /// The error message shown first
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            message: error.to_string(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// The whole error chain is searched, so context added with
/// `anyhow::Context` does not hide the typed error underneath.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(xht_error) = cause.downcast_ref::<XhtError>() {
            return create_error_context(xht_error);
        }

        if let Some(template_error) = cause.downcast_ref::<TemplateError>() {
            return template_error_context(&error, template_error);
        }

        if let Some(file_error) = cause.downcast_ref::<FileOperationError>() {
            let context = ErrorContext::new(&error).with_details(file_error.user_message());
            return match file_error.operation {
                FileOperation::Write | FileOperation::CreateDir => {
                    context.with_suggestion("Check that the output directory is writable")
                }
                _ => context,
            };
        }

        if let Some(toml_error) = cause.downcast_ref::<toml::de::Error>() {
            return ErrorContext::new(&error)
                .with_details(toml_error.to_string())
                .with_suggestion(
                    "Check the TOML syntax in your configuration. Verify quotes, brackets, and table names",
                );
        }

        if let Some(cache_error) = cause.downcast_ref::<CacheError>() {
            return ErrorContext::new(cache_error)
                .with_suggestion("Set `cache_size` to a positive number in xhtpress.toml");
        }
    }

    let mut context = ErrorContext::new(&error);
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        context = context.with_details(chain.join("\n  caused by: "));
    }
    context
}

fn create_error_context(error: &XhtError) -> ErrorContext {
    match error {
        XhtError::ConfigNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Create xhtpress.toml in the site root or pass --config <PATH>")
            .with_details("xhtpress reads site settings, the `site` table and page defaults from it"),
        XhtError::ConfigParseError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check the TOML syntax in your configuration. Verify quotes, brackets, and table names",
        ),
        XhtError::ConfigValidationError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Fix the reported value in xhtpress.toml and run the command again"),
        XhtError::ContentDirNotFound {
            path,
        } => ErrorContext::new(error)
            .with_suggestion(format!("Create '{path}' or point `content_dir` at your pages"))
            .with_details("Every regular file in the content directory becomes one output page"),
        XhtError::InvalidTemplateReference {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Set `\"template\": \"name\"` in the page frontmatter or `default_template` in xhtpress.toml",
        ),
    }
}

fn template_error_context(error: &anyhow::Error, template_error: &TemplateError) -> ErrorContext {
    let context = ErrorContext::new(error);
    match template_error {
        TemplateError::Load {
            source,
            ..
        } => context.with_details(source.user_message()),
        TemplateError::IncludeUnresolved {
            path,
            ..
        } => context
            .with_details(format!("`{path}` is undefined or not a string in the current scope"))
            .with_suggestion("Make sure the scope provides the include name before rendering"),
        TemplateError::IncludeDepth {
            ..
        } => context.with_suggestion(
            "Look for templates that include each other; include chains must terminate",
        ),
        TemplateError::Widget {
            name,
            source,
        } => context.with_details(source.to_string()).with_suggestion(format!(
            "The '{name}' widget handler failed; the page was not written to avoid partial output"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_context_display() {
        let context = ErrorContext::new(XhtError::ConfigNotFound {
            path: "site.toml".to_string(),
        })
        .with_details("details here")
        .with_suggestion("do this");

        let text = context.to_string();
        assert!(text.starts_with("Configuration file 'site.toml' not found"));
        assert!(text.contains("Details: details here"));
        assert!(text.contains("Suggestion: do this"));
    }

    #[test]
    fn test_user_friendly_error_finds_typed_error_under_context() {
        let error = Err::<(), _>(XhtError::ContentDirNotFound {
            path: "content".to_string(),
        })
        .context("building site")
        .unwrap_err();

        let context = user_friendly_error(error);
        assert!(context.message.contains("Content directory 'content' not found"));
        assert!(context.suggestion.unwrap().contains("content_dir"));
    }

    #[test]
    fn test_widget_failure_reports_cause_once() {
        let error = anyhow::Error::from(TemplateError::Widget {
            name: "gallery".to_string(),
            source: "image store offline".into(),
        })
        .context("Failed to build page 'index'");

        let context = user_friendly_error(error);
        assert_eq!(context.message, "Failed to build page 'index'");
        assert_eq!(context.details.as_deref(), Some("image store offline"));
        assert!(context.suggestion.unwrap().contains("'gallery'"));
    }

    #[test]
    fn test_output_failure_suggests_checking_permissions() {
        let error = anyhow::Error::from(FileOperationError::new(
            FileOperation::Write,
            "www/index.html",
            "writing page",
            std::io::Error::other("disk full"),
        ));

        let context = user_friendly_error(error);
        assert!(context.details.unwrap().contains("disk full"));
        assert!(context.suggestion.unwrap().contains("writable"));
    }

    #[test]
    fn test_user_friendly_error_fallback_lists_causes() {
        let error = anyhow::anyhow!("root cause").context("outer");
        let context = user_friendly_error(error);

        assert_eq!(context.message, "outer");
        assert_eq!(context.details.as_deref(), Some("root cause"));
    }
}
