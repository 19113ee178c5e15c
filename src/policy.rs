//! Raw lane predictions -> published directional green times.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::types::PredictionResult;

/// Clip bounds for per-lane model output and the final publishable range.
///
/// Lanes 0-1 form the east-west axis and lanes 2-3 the south-north axis; the
/// longer movement of each pair decides that axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    /// Lower bound the raw model output is clipped to.
    pub clip_min: f64,
    /// Upper bound the raw model output is clipped to.
    pub clip_max: f64,
    /// Minimum published duration; `None` publishes short times as-is.
    pub floor: Option<u32>,
    /// Maximum published duration.
    pub ceiling: u32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            clip_min: 30.0,
            clip_max: 99.0,
            floor: None,
            ceiling: 99,
        }
    }
}

impl DecisionPolicy {
    /// The earlier deployment: same clip, published range 40-120s.
    pub fn legacy() -> Self {
        Self {
            floor: Some(40),
            ceiling: 120,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.clip_min.is_finite() || !self.clip_max.is_finite() {
            bail!("clip bounds must be finite");
        }
        if self.clip_min < 0.0 {
            bail!("clip_min must be non-negative, got {}", self.clip_min);
        }
        if self.clip_min > self.clip_max {
            bail!(
                "clip_min ({}) is greater than clip_max ({})",
                self.clip_min,
                self.clip_max
            );
        }
        if let Some(floor) = self.floor {
            if floor > self.ceiling {
                bail!("floor ({}) is greater than ceiling ({})", floor, self.ceiling);
            }
        }
        Ok(())
    }

    /// Inclusive range every published duration falls in.
    pub fn published_range(&self) -> (u32, u32) {
        (self.floor.unwrap_or(0), self.ceiling)
    }

    /// Clip one raw prediction and round it, ties to even.
    pub fn clip(&self, raw: f64) -> u32 {
        raw.max(self.clip_min).min(self.clip_max).round_ties_even() as u32
    }

    pub fn clip_all(&self, raw: &[f64; 4]) -> [u32; 4] {
        raw.map(|r| self.clip(r))
    }

    /// Apply the publishable range to one directional value.
    pub fn clamp(&self, seconds: u32) -> u32 {
        let capped = seconds.min(self.ceiling);
        match self.floor {
            Some(floor) => capped.max(floor),
            None => capped,
        }
    }

    /// Pair already-clipped lane values into the two axes.
    pub fn pair(&self, lanes: &[u32; 4]) -> PredictionResult {
        PredictionResult {
            east_west_seconds: self.clamp(lanes[0].max(lanes[1])),
            south_north_seconds: self.clamp(lanes[2].max(lanes[3])),
        }
    }

    pub fn decide(&self, raw: &[f64; 4]) -> PredictionResult {
        self.pair(&self.clip_all(raw))
    }
}
