use std::str::FromStr;

use anyhow::{bail, Error};
use serde::{Deserialize, Serialize};

/// How to choose between several percentages that are equally good
/// candidates for one keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AmbiguityPolicy {
    /// Take the highest value.
    #[default]
    Largest,
    /// Take the lowest value.
    Smallest,
    /// Take the leftmost match.
    First,
}

impl FromStr for AmbiguityPolicy {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "largest" | "max" => Ok(AmbiguityPolicy::Largest),
            "smallest" | "min" => Ok(AmbiguityPolicy::Smallest),
            "first" | "leftmost" => Ok(AmbiguityPolicy::First),
            other => bail!("unknown ambiguity policy '{other}'"),
        }
    }
}

/// Tunables for the keyword/percentage matcher.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    /// A percentage at most this many bytes away from a keyword counts as
    /// "immediately adjacent" to it.
    pub adjacency_gap: usize,

    /// How many lines above/below a keyword-only line are searched for its value.
    pub line_window: usize,

    /// Accept bare 0–100 numbers on lines that have no `NN%` token.
    pub accept_bare_numbers: bool,

    pub ambiguity: AmbiguityPolicy,

    /// Fill still-missing fields from an unlabeled `P% T% B%` triplet summing to ~100,
    /// on one line or across consecutive lines.
    pub infer_unlabeled_triplet: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            adjacency_gap: 3,
            line_window: 1,
            accept_bare_numbers: true,
            ambiguity: AmbiguityPolicy::Largest,
            infer_unlabeled_triplet: true,
        }
    }
}
