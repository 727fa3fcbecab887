//! Error types for catalog loading, profile lookup and configuration.
//!
//! The computational core (extraction, graph building, modulation) never fails on
//! well-typed input; these errors only surface at the loading boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Duplicate region code: {0}")]
    DuplicateRegion(String),

    #[error("Region code must not be empty (row {row})")]
    EmptyCode { row: usize },

    #[error("Value out of range for {field} on {code}: {value} (expected 0.0..=1.0)")]
    OutOfRange {
        code: String,
        field: &'static str,
        value: f64,
    },

    #[error("Unknown connection kind '{0}'")]
    UnknownKind(String),

    #[error("Malformed pair key '{0}' (expected CODE-CODE)")]
    MalformedPairKey(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Unknown intervention: {0}")]
    UnknownIntervention(String),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Unknown duration '{0}' (expected short, standard or extended)")]
    UnknownDuration(String),

    #[error("Pair {key} listed more than once in table '{tag}'")]
    DuplicatePair { tag: String, key: String },

    #[error("Tag '{0}' defined more than once (tags are case-insensitive)")]
    DuplicateTag(String),

    #[error("Invalid profile library: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Weight bounds invalid: min {min} / max {max}")]
    WeightBounds { min: f64, max: f64 },

    #[error("{name} must be a finite non-negative number, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("jitter_amplitude must not exceed 1.0, got {0}")]
    JitterTooLarge(f64),
}
