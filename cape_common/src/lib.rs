//! Cape Common Library
//!
//! This crate provides the shared types for all cape-core workspace crates:
//! the operating-state enum, the compiled-in peripheral identity table, the
//! configuration validator, the board driver trait, and the error taxonomy.
//!
//! # Module Structure
//!
//! - [`state`] - Operating-state enum and permitted-edge table
//! - [`peripheral`] - Peripheral identities, values, and button events
//! - [`config`] - Configuration validator and board configuration file
//! - [`driver`] - Board driver trait (pluggable hardware backends)
//! - [`error`] - Error types shared across the workspace
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! cape_common = { path = "../cape_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use cape_common::prelude::*;
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod driver;
pub mod error;
pub mod peripheral;
pub mod prelude;
pub mod state;
