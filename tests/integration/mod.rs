//! Integration test suite for xhtpress
//!
//! End-to-end tests that build real sites in temporary directories, through the
//! library and through the `xhtpress` binary.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **build**: full site builds through `SiteBuilder`
//! - **cli**: the `build` and `render` commands, exit codes and error output

mod build;
mod cli;
