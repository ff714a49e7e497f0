use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three betting outcomes shown on the statistics panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Player,
    Banker,
    Tie,
}

impl Side {
    pub const ALL: [Side; 3] = [Side::Player, Side::Banker, Side::Tie];

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Banker => "banker",
            Side::Tie => "tie",
        }
    }
}

/// Which extraction path produced an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    Ocr,
    Html,
}

/// Raw extraction output: zero to three percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentages {
    pub player: Option<f64>,
    pub banker: Option<f64>,
    pub tie: Option<f64>,
}

impl Percentages {
    pub fn get(&self, side: Side) -> Option<f64> {
        match side {
            Side::Player => self.player,
            Side::Banker => self.banker,
            Side::Tie => self.tie,
        }
    }

    pub fn set(&mut self, side: Side, value: f64) {
        let slot = match side {
            Side::Player => &mut self.player,
            Side::Banker => &mut self.banker,
            Side::Tie => &mut self.tie,
        };
        *slot = Some(value);
    }

    pub fn found(&self) -> usize {
        Side::ALL.iter().filter(|side| self.get(**side).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.found() == 0
    }
}

/// A single poll cycle's snapshot. Holds at least one percentage; the only
/// way to build one is [`Observation::from_percentages`], which enforces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub player_pct: Option<f64>,
    pub banker_pct: Option<f64>,
    pub tie_pct: Option<f64>,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    pub fn from_percentages(values: Percentages, source: Source) -> Option<Self> {
        Self::at(values, source, Utc::now())
    }

    pub fn at(values: Percentages, source: Source, timestamp: DateTime<Utc>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        Some(Self {
            player_pct: values.player,
            banker_pct: values.banker,
            tie_pct: values.tie,
            source,
            timestamp,
        })
    }

    /// Alert condition: the player share is known and strictly above `threshold`.
    pub fn player_above(&self, threshold: f64) -> bool {
        self.player_pct.is_some_and(|pct| pct > threshold)
    }
}
