//! gradetree: hierarchical weighted gradebooks with exact aggregation.
//!
//! Layers, innermost first:
//! - [`domain`]: assignment and grade trees, parsing, aggregation (no I/O)
//! - [`application`]: gradebook service over a filesystem boundary
//! - [`infrastructure`]: real filesystem and service wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
