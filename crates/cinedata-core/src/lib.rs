//! Core data model for cinedata.
//!
//! This crate defines the IMDb base and derived tables, the tab-separated
//! codec used for staged and processed files, and the SQLite-backed table
//! store the loader and analytics stages write into.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;
pub mod tsv;

pub use error::{Error, Result};
