//! Snapshot-to-RSS archiving and daily digest generation.
//!
//! The binary in `main.rs` wires these modules into a single batch run; the library
//! exposes them so each phase can be driven and tested on its own.

pub mod archive;
pub mod cli;
pub mod config;
pub mod dates;
pub mod digest;
pub mod error;
pub mod models;
pub mod outputs;
pub mod scrapers;
pub mod utils;
pub mod watermark;
