//! Flag-driven state inference.
//!
//! Upstream producers often only know coarse boolean signals ("edited a
//! single file", "pushed with force"). A [`RuleTable`] turns those into a raw
//! observation: every dimension starts at the midpoint and each rule whose
//! flag is set adds its delta. The table is plain data so deployments can
//! replace it through configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::state::{clamp_value, Dimensions, DEFAULT_VALUE};

/// One `{flag, dimension, delta}` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRule {
    pub flag: String,
    pub dimension: String,
    pub delta: f64,
}

impl InferenceRule {
    pub fn new(flag: impl Into<String>, dimension: impl Into<String>, delta: f64) -> Self {
        Self {
            flag: flag.into(),
            dimension: dimension.into(),
            delta,
        }
    }
}

/// The built-in rule set for the default dimensions.
pub fn default_rules() -> Vec<InferenceRule> {
    [
        ("single_file", "focus", 20.0),
        ("many_files", "focus", -15.0),
        ("many_files", "breadth", 20.0),
        ("rapid_edits", "pace", 25.0),
        ("long_pauses", "pace", -20.0),
        ("reads_docs", "depth", 20.0),
        ("writes_tests", "depth", 10.0),
        ("writes_tests", "risk", -15.0),
        ("explores_codebase", "breadth", 25.0),
        ("force_push", "risk", 30.0),
        ("skips_review", "risk", 20.0),
    ]
    .into_iter()
    .map(|(flag, dim, delta)| InferenceRule::new(flag, dim, delta))
    .collect()
}

/// An ordered list of inference rules bound to a dimension set.
#[derive(Debug, Clone)]
pub struct RuleTable {
    dimensions: Dimensions,
    rules: Vec<InferenceRule>,
}

impl RuleTable {
    /// Rules naming a dimension outside `dimensions` are kept but never apply.
    pub fn new(dimensions: Dimensions, rules: Vec<InferenceRule>) -> Self {
        for rule in &rules {
            if dimensions.index_of(&rule.dimension).is_none() {
                tracing::warn!(
                    flag = %rule.flag,
                    dimension = %rule.dimension,
                    "inference rule targets unknown dimension"
                );
            }
        }
        Self { dimensions, rules }
    }

    pub fn rules(&self) -> &[InferenceRule] {
        &self.rules
    }

    /// Map behavior flags to a raw observation covering every dimension.
    pub fn infer_state(&self, flags: &HashMap<String, bool>) -> HashMap<String, f64> {
        let mut state: HashMap<String, f64> = self
            .dimensions
            .names()
            .iter()
            .map(|d| (d.clone(), DEFAULT_VALUE))
            .collect();

        for rule in &self.rules {
            if !flags.get(&rule.flag).copied().unwrap_or(false) {
                continue;
            }
            if let Some(value) = state.get_mut(&rule.dimension) {
                *value += rule.delta;
            }
        }

        for value in state.values_mut() {
            *value = clamp_value(*value).unwrap_or(DEFAULT_VALUE);
        }

        state
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(Dimensions::default(), default_rules())
    }
}
