//! Points in the behavioral state space.
//!
//! A [`StateVector`] is one observation: a value per configured dimension,
//! always inside `[0, 100]`, plus the time it was ingested. The dimension set
//! is fixed per detector instance and carried separately as [`Dimensions`];
//! vectors store their values positionally in that order.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::ConfigError;

/// Lower bound of every dimension.
pub const MIN_VALUE: f64 = 0.0;

/// Upper bound of every dimension.
pub const MAX_VALUE: f64 = 100.0;

/// Value assumed for a dimension missing from a raw observation.
pub const DEFAULT_VALUE: f64 = 50.0;

/// Largest dimension set the heuristics are tuned for.
pub const MAX_DIMENSIONS: usize = 8;

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free set of dimension names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Dimensions(Vec<String>);

impl Dimensions {
    /// Build a dimension set, rejecting empty, duplicate or oversized lists.
    pub fn new<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if names.is_empty() {
            return Err(ConfigError::EmptyDimensions);
        }
        if names.len() > MAX_DIMENSIONS {
            return Err(ConfigError::TooManyDimensions(names.len()));
        }

        let mut seen = HashSet::new();
        for name in &names {
            if name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "dimension name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateDimension(name.clone()));
            }
        }

        Ok(Self(names))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self(
            ["focus", "pace", "depth", "breadth", "risk"]
                .into_iter()
                .map(String::from)
                .collect(),
        )
    }
}

impl TryFrom<Vec<String>> for Dimensions {
    type Error = ConfigError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<Dimensions> for Vec<String> {
    fn from(dims: Dimensions) -> Self {
        dims.0
    }
}

// ---------------------------------------------------------------------------
// StateVector
// ---------------------------------------------------------------------------

/// A single normalized observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    /// One value per dimension, in [`Dimensions`] order, each in `[0, 100]`.
    pub values: Vec<f64>,

    /// When the observation was ingested.
    pub timestamp: DateTime<Utc>,
}

impl StateVector {
    /// Normalize a raw observation against the configured dimensions.
    ///
    /// Missing and NaN values become [`DEFAULT_VALUE`]; everything else is
    /// clamped into range. Keys outside the dimension set are ignored.
    pub fn from_raw(
        raw: &HashMap<String, f64>,
        dimensions: &Dimensions,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let values = dimensions
            .names()
            .iter()
            .map(|dim| {
                raw.get(dim)
                    .copied()
                    .and_then(clamp_value)
                    .unwrap_or(DEFAULT_VALUE)
            })
            .collect();

        Self { values, timestamp }
    }

    /// Build a vector from positional values, clamping each one.
    pub fn from_values(values: Vec<f64>, timestamp: DateTime<Utc>) -> Self {
        let values = values
            .into_iter()
            .map(|v| clamp_value(v).unwrap_or(DEFAULT_VALUE))
            .collect();
        Self { values, timestamp }
    }

    /// Look up a value by dimension name.
    pub fn get(&self, dimensions: &Dimensions, name: &str) -> Option<f64> {
        dimensions
            .index_of(name)
            .and_then(|i| self.values.get(i).copied())
    }

    /// Render as a name → value map.
    pub fn to_map(&self, dimensions: &Dimensions) -> BTreeMap<String, f64> {
        dimensions
            .names()
            .iter()
            .cloned()
            .zip(self.values.iter().copied())
            .collect()
    }

    pub fn distance_to(&self, point: &[f64]) -> f64 {
        euclidean_distance(&self.values, point)
    }
}

/// Clamp a raw value into `[MIN_VALUE, MAX_VALUE]`; NaN has no clamped value.
pub fn clamp_value(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value.clamp(MIN_VALUE, MAX_VALUE))
    }
}

/// Euclidean distance over the shared prefix of two points.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
