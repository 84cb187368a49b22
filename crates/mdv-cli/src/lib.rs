//! # mdv-cli: command-line front end for mdv-schema
//!
//! Provides the `mdv` binary:
//!
//! ```bash
//! mdv check docs/models.yml
//! mdv check --format json < docs/models.yml
//! MDV_MODELS_PATH=docs/models.yml mdv -v check
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing and configuration live here; decoding and
//!   validation live in `mdv-schema`.
//! - The report goes to stdout, logs go to stderr.

pub mod check;
pub mod config;
