use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems loading or validating a personality profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile name must not be empty")]
    EmptyName,
    #[error("profile name '{0}' must not contain braces, commas, '=' or control characters")]
    InvalidName(String),
    #[error("profile '{profile}': unknown feature '{feature}' (known: {known})")]
    UnknownFeature {
        profile: String,
        feature: String,
        known: String,
    },
    #[error("profile '{profile}': {field} must be a finite number")]
    NonFinite { profile: String, field: String },
    #[error("profile '{profile}': risk_budget must be >= 0, got {value}")]
    NegativeRiskBudget { profile: String, value: f64 },
    #[error("profile '{profile}': temperature must be >= 0, got {value}")]
    NegativeTemperature { profile: String, value: f64 },
    #[error("invalid profile TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("{0}: profiles must be .toml or .json files")]
    UnsupportedFormat(PathBuf),
    #[error("profile '{name}' defined twice ({first} and {second})")]
    Duplicate {
        name: String,
        first: String,
        second: String,
    },
    #[error("unknown profile '{name}' (available: {available})")]
    NotFound { name: String, available: String },
}

/// Why the bias engine could not pick a move.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectError {
    #[error("no candidate moves to choose from")]
    NoCandidates,
    #[error("profile '{profile}' admits no candidate (best objective {best})")]
    NoAdmissibleCandidates { profile: String, best: f64 },
    #[error("cannot sample the biased distribution: {0}")]
    Sampling(String),
}
