#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Model configuration loading, validation, and discovery.
//!
//! Configurations are persisted as a JSON object keyed by aircraft model
//! name. [`ConfigRegistry`] loads such a file entry by entry: an entry that
//! fails validation is excluded and reported as a
//! [`RejectedConfiguration`] instead of failing the whole load.
//!
//! New configurations are bootstrapped from a model's template
//! spreadsheet with [`template::analyze_template`], which detects field
//! and upgrade rows from the label column.

pub mod registry;
pub mod template;

pub use broker_sheet_config_models as models;
pub use registry::{ConfigRegistry, RejectedConfiguration};

/// Errors that can occur while loading or saving configurations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON, or its top level is not an object.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The template workbook could not be read.
    #[error("Workbook error: {0}")]
    Workbook(#[from] broker_sheet_workbook::WorkbookError),
}
