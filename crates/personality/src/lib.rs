//! Personality layer for self-play.
//!
//! A [`PersonalityProfile`] weights a handful of board [`features`] and sets
//! a risk budget. The [`BiasEngine`] uses both to choose among an engine's
//! scored candidates without ever giving up more than the budget allows.

pub mod bias;
pub mod error;
pub mod features;
pub mod profile;

pub use bias::{BiasEngine, Selection};
pub use error::{ProfileError, SelectError};
pub use features::{
    Feature, FeatureSource, FeatureTable, FeatureVector, HeuristicFeatures, extract,
};
pub use profile::{FeatureWeights, PersonalityProfile, ProfileBuilder, ProfileLibrary};
