//! Unit test suite for xhtpress
//!
//! Exercises the public library API one component at a time, without running
//! the binary.
//!
//! ```bash
//! cargo test --test unit
//! ```
//!
//! # Test Organization
//!
//! - **cache**: bounded cache recency order and eviction listeners
//! - **content**: frontmatter parsing and page scopes
//! - **templating**: the template language through `process_segment` and `TemplateEngine`

mod cache;
mod content;
mod templating;
