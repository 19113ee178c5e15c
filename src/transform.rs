//! Offline-fitted standardization parameters.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::schema::SCALED_FEATURES;

pub const SCALED_COUNT: usize = SCALED_FEATURES.len();

// Accepts both our export keys and the scikit-learn attribute names.
#[derive(Deserialize)]
struct TransformJson {
    #[serde(alias = "feature_names_in_")]
    feature_names: Vec<String>,
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
}

/// Per-column `(x - mean) / scale` over [`SCALED_FEATURES`], in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationTransform {
    mean: [f64; SCALED_COUNT],
    scale: [f64; SCALED_COUNT],
}

impl NormalizationTransform {
    pub fn new(mean: &[f64], scale: &[f64]) -> Result<Self> {
        if mean.len() != SCALED_COUNT || scale.len() != SCALED_COUNT {
            bail!(
                "transform expects {} columns, got mean[{}] scale[{}]",
                SCALED_COUNT,
                mean.len(),
                scale.len()
            );
        }
        let mut t = Self {
            mean: [0.0; SCALED_COUNT],
            scale: [1.0; SCALED_COUNT],
        };
        for i in 0..SCALED_COUNT {
            if !mean[i].is_finite() || !scale[i].is_finite() {
                bail!("non-finite parameter for column {}", SCALED_FEATURES[i]);
            }
            t.mean[i] = mean[i];
            // zero-variance columns were fitted with scale 1
            t.scale[i] = if scale[i] == 0.0 { 1.0 } else { scale[i] };
        }
        Ok(t)
    }

    /// Mean 0, scale 1 on every column.
    pub fn identity() -> Self {
        Self {
            mean: [0.0; SCALED_COUNT],
            scale: [1.0; SCALED_COUNT],
        }
    }

    pub fn from_json_str(txt: &str) -> Result<Self> {
        let raw: TransformJson =
            serde_json::from_str(txt).context("failed to parse transform json")?;
        if raw.feature_names.len() != SCALED_COUNT
            || raw
                .feature_names
                .iter()
                .zip(SCALED_FEATURES.iter())
                .any(|(a, b)| a != b)
        {
            bail!(
                "transform columns {:?} do not match the expected order {:?}",
                raw.feature_names,
                SCALED_FEATURES
            );
        }
        Self::new(&raw.mean, &raw.scale)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read transform at {}", path.display()))?;
        Self::from_json_str(&txt)
            .with_context(|| format!("invalid transform artifact {}", path.display()))
    }

    /// Standardize `values` in place.
    pub fn apply(&self, values: &mut [f64; SCALED_COUNT]) {
        for ((v, m), s) in values.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - m) / s;
        }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(scale_at_zero: f64) -> String {
        let mut scale = vec![2.0; SCALED_COUNT];
        scale[0] = scale_at_zero;
        json!({
            "feature_names_in_": SCALED_FEATURES,
            "mean_": vec![1.0; SCALED_COUNT],
            "scale_": scale,
        })
        .to_string()
    }

    #[test]
    fn sklearn_keys_are_accepted() {
        let t = NormalizationTransform::from_json_str(&artifact(4.0)).unwrap();
        let mut v = [5.0; SCALED_COUNT];
        t.apply(&mut v);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[1], 2.0);
    }

    #[test]
    fn zero_scale_acts_as_unit_scale() {
        let t = NormalizationTransform::from_json_str(&artifact(0.0)).unwrap();
        assert_eq!(t.scale()[0], 1.0);
        let mut v = [3.0; SCALED_COUNT];
        t.apply(&mut v);
        assert_eq!(v[0], 2.0);
    }

    #[test]
    fn reordered_columns_are_rejected() {
        let mut names: Vec<&str> = SCALED_FEATURES.to_vec();
        names.swap(10, 11); // DayOfWeek <-> Hour
        let txt = json!({
            "feature_names": names,
            "mean": vec![0.0; SCALED_COUNT],
            "scale": vec![1.0; SCALED_COUNT],
        })
        .to_string();
        assert!(NormalizationTransform::from_json_str(&txt).is_err());
    }

    #[test]
    fn short_parameter_lists_are_rejected() {
        assert!(NormalizationTransform::new(&[0.0; 3], &[1.0; 3]).is_err());
    }
}
