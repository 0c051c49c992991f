//! Personality profiles: feature weights plus the risk budget and
//! temperature that bound how far a side may stray from the engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProfileError;
use crate::features::{Feature, FeatureVector};

/// One weight per feature. Unset features weigh 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureWeights([f64; Feature::COUNT]);

impl FeatureWeights {
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature.idx()]
    }

    pub fn set(&mut self, feature: Feature, weight: f64) {
        self.0[feature.idx()] = weight;
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|w| *w == 0.0)
    }

    /// Weighted sum of a feature vector, in centipawns.
    pub fn apply(&self, features: &FeatureVector) -> f64 {
        self.0
            .iter()
            .zip(features.values())
            .map(|(w, x)| w * x)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Feature, f64)> + '_ {
        Feature::ALL.into_iter().map(|f| (f, self.get(f)))
    }
}

/// A validated, immutable personality profile.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonalityProfile {
    name: String,
    version: u32,
    description: Option<String>,
    weights: FeatureWeights,
    risk_budget: f64,
    temperature: f64,
}

/// On-disk shape of a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    name: String,
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    risk_budget: f64,
    #[serde(default)]
    temperature: f64,
    #[serde(default)]
    weights: BTreeMap<String, f64>,
}

fn default_version() -> u32 {
    1
}

impl PersonalityProfile {
    /// The baseline: zero weights, zero budget, deterministic.
    pub fn null(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: 1,
            description: None,
            weights: FeatureWeights::default(),
            risk_budget: 0.0,
            temperature: 0.0,
        }
    }

    pub fn builder(name: &str) -> ProfileBuilder {
        ProfileBuilder {
            profile: Self::null(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn weights(&self) -> &FeatureWeights {
        &self.weights
    }

    /// Maximum centipawns the chosen move may trail the best objective by.
    pub fn risk_budget(&self) -> f64 {
        self.risk_budget
    }

    /// Softmax temperature in centipawns; 0 means deterministic argmax.
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ProfileError> {
        let file: ProfileFile = toml::from_str(text)?;
        Self::try_from(file)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ProfileError> {
        let file: ProfileFile = serde_json::from_str(text)?;
        Self::try_from(file)
    }

    /// Load a `.toml` or `.json` profile file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(ProfileError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Render back to TOML, with weights keyed by feature name.
    pub fn to_toml_string(&self) -> String {
        let file = ProfileFile {
            name: self.name.clone(),
            version: self.version,
            description: self.description.clone(),
            weights: self
                .weights
                .iter()
                .filter(|(_, w)| *w != 0.0)
                .map(|(f, w)| (f.name().to_string(), w))
                .collect(),
            risk_budget: self.risk_budget,
            temperature: self.temperature,
        };
        // Plain strings, maps and floats always serialize.
        toml::to_string_pretty(&file).unwrap_or_default()
    }

    fn validate(self) -> Result<Self, ProfileError> {
        let profile = self.name.clone();
        if profile.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }
        // The name is written into move comments as `profile=<name>`.
        if profile
            .chars()
            .any(|c| matches!(c, '{' | '}' | ',' | '=') || c.is_control())
        {
            return Err(ProfileError::InvalidName(profile));
        }
        for (feature, w) in self.weights.iter() {
            if !w.is_finite() {
                return Err(ProfileError::NonFinite {
                    profile,
                    field: format!("weights.{feature}"),
                });
            }
        }
        if !self.risk_budget.is_finite() {
            return Err(ProfileError::NonFinite {
                profile,
                field: "risk_budget".into(),
            });
        }
        if self.risk_budget < 0.0 {
            return Err(ProfileError::NegativeRiskBudget {
                profile,
                value: self.risk_budget,
            });
        }
        if !self.temperature.is_finite() {
            return Err(ProfileError::NonFinite {
                profile,
                field: "temperature".into(),
            });
        }
        if self.temperature < 0.0 {
            return Err(ProfileError::NegativeTemperature {
                profile,
                value: self.temperature,
            });
        }
        Ok(self)
    }
}

impl TryFrom<ProfileFile> for PersonalityProfile {
    type Error = ProfileError;

    fn try_from(file: ProfileFile) -> Result<Self, Self::Error> {
        let mut weights = FeatureWeights::default();
        for (key, w) in &file.weights {
            let Some(feature) = Feature::from_name(key) else {
                return Err(ProfileError::UnknownFeature {
                    profile: file.name.clone(),
                    feature: key.clone(),
                    known: Feature::known_names(),
                });
            };
            weights.set(feature, *w);
        }
        PersonalityProfile {
            name: file.name,
            version: file.version,
            description: file.description,
            weights,
            risk_budget: file.risk_budget,
            temperature: file.temperature,
        }
        .validate()
    }
}

/// Builder for profiles constructed in code.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    profile: PersonalityProfile,
}

impl ProfileBuilder {
    pub fn version(mut self, version: u32) -> Self {
        self.profile.version = version;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.profile.description = Some(description.to_string());
        self
    }

    pub fn weight(mut self, feature: Feature, weight: f64) -> Self {
        self.profile.weights.set(feature, weight);
        self
    }

    pub fn risk_budget(mut self, cp: f64) -> Self {
        self.profile.risk_budget = cp;
        self
    }

    pub fn temperature(mut self, cp: f64) -> Self {
        self.profile.temperature = cp;
        self
    }

    pub fn build(self) -> Result<PersonalityProfile, ProfileError> {
        self.profile.validate()
    }
}

const BUILTIN: [(&str, &str); 5] = [
    ("neutral.toml", include_str!("../profiles/neutral.toml")),
    ("aggressive.toml", include_str!("../profiles/aggressive.toml")),
    ("defensive.toml", include_str!("../profiles/defensive.toml")),
    ("positional.toml", include_str!("../profiles/positional.toml")),
    ("tactician.toml", include_str!("../profiles/tactician.toml")),
];

/// Named profiles available to a run.
#[derive(Debug, Clone, Default)]
pub struct ProfileLibrary {
    profiles: BTreeMap<String, (Arc<PersonalityProfile>, String)>,
}

impl ProfileLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The profiles shipped with the crate.
    pub fn builtin() -> Result<Self, ProfileError> {
        let mut lib = Self::empty();
        for (source, text) in BUILTIN {
            lib.insert(PersonalityProfile::from_toml_str(text)?, format!("builtin:{source}"));
        }
        Ok(lib)
    }

    /// Add or replace a profile. `source` names where it came from.
    pub fn insert(&mut self, profile: PersonalityProfile, source: String) {
        self.profiles
            .insert(profile.name().to_string(), (Arc::new(profile), source));
    }

    /// Load every `.toml` and `.json` file in `dir`, in file-name order.
    ///
    /// Directory profiles replace built-ins of the same name; two files in
    /// the directory defining one name is an error.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ProfileError> {
        let io_err = |source| ProfileError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let supported = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("toml" | "json")
            );
            if path.is_file() && supported {
                paths.push(path);
            }
        }
        paths.sort();

        let mut seen: BTreeMap<String, String> = BTreeMap::new();
        for path in &paths {
            let profile = PersonalityProfile::load(path)?;
            let source = path.display().to_string();
            if let Some(first) = seen.get(profile.name()) {
                return Err(ProfileError::Duplicate {
                    name: profile.name().to_string(),
                    first: first.clone(),
                    second: source,
                });
            }
            debug!(profile = profile.name(), %source, "loaded profile");
            seen.insert(profile.name().to_string(), source.clone());
            self.insert(profile, source);
        }
        Ok(paths.len())
    }

    pub fn get(&self, name: &str) -> Result<Arc<PersonalityProfile>, ProfileError> {
        self.profiles
            .get(name)
            .map(|(p, _)| Arc::clone(p))
            .ok_or_else(|| ProfileError::NotFound {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Profiles with the place each was loaded from.
    pub fn iter(&self) -> impl Iterator<Item = (&PersonalityProfile, &str)> {
        self.profiles
            .values()
            .map(|(p, source)| (p.as_ref(), source.as_str()))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod profile_tests;
