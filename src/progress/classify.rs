// src/progress/classify.rs

//! Line classification.
//!
//! The external program reports progress with lines such as
//! `[Rank3] blur aplicado a imagen 7`. Only lines starting with the literal
//! tag `[Rank` are considered; the phrase match is case-insensitive.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::errors::{MpiwatchError, Result};
use crate::types::EventWeight;

/// Tag every progress line must start with.
pub const RANK_PREFIX: &str = "[Rank";

/// One row of the classification table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClassificationRule {
    /// Literal, case-sensitive line prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Case-insensitive substring the line must contain.
    pub contains: String,
    /// Weight added to the event counter on match.
    pub weight: EventWeight,
}

fn default_prefix() -> String {
    RANK_PREFIX.to_string()
}

impl ClassificationRule {
    pub fn new(prefix: &str, contains: &str, weight: EventWeight) -> Self {
        Self {
            prefix: prefix.to_string(),
            contains: contains.to_string(),
            weight,
        }
    }
}

/// The built-in table: one blur pass per event, five light filters at once.
pub fn default_rules() -> Vec<ClassificationRule> {
    vec![
        ClassificationRule::new(RANK_PREFIX, "blur aplicado", 1),
        ClassificationRule::new(RANK_PREFIX, "filtros ligeros procesados", 5),
    ]
}

#[derive(Debug, Clone)]
struct CompiledRule {
    prefix: String,
    needle: String,
    weight: EventWeight,
}

/// Ordered rule table. The first matching rule wins.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<CompiledRule>,
}

impl Classifier {
    pub fn new(rules: Vec<ClassificationRule>) -> Result<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (idx, rule) in rules.into_iter().enumerate() {
            if rule.contains.is_empty() {
                return Err(MpiwatchError::ConfigError(format!(
                    "rule #{idx}: `contains` must not be empty"
                )));
            }
            if rule.weight == 0 {
                return Err(MpiwatchError::ConfigError(format!(
                    "rule #{idx} ('{}'): weight must be >= 1",
                    rule.contains
                )));
            }
            compiled.push(CompiledRule {
                prefix: rule.prefix,
                needle: rule.contains.to_lowercase(),
                weight: rule.weight,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Weight of `line`, or 0 when no rule matches.
    pub fn classify(&self, line: &str) -> EventWeight {
        let mut lowered: Option<String> = None;

        for rule in &self.rules {
            if !line.starts_with(&rule.prefix) {
                continue;
            }
            let haystack = lowered.get_or_insert_with(|| line.to_lowercase());
            if haystack.contains(&rule.needle) {
                return rule.weight;
            }
        }
        0
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let rules = default_rules()
            .into_iter()
            .map(|r| CompiledRule {
                needle: r.contains.to_lowercase(),
                prefix: r.prefix,
                weight: r.weight,
            })
            .collect();
        Self { rules }
    }
}

/// Classify `line` against the built-in table.
pub fn classify(line: &str) -> EventWeight {
    static DEFAULT: OnceLock<Classifier> = OnceLock::new();
    DEFAULT.get_or_init(Classifier::default).classify(line)
}
