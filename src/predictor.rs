//! Batch orchestration: shape check -> features -> model -> decision.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{resolve_artifact_path, Config};
use crate::error::PredictError;
use crate::features::{FeatureEngineer, FeatureSummary};
use crate::model::{self, RegressionModel};
use crate::policy::DecisionPolicy;
use crate::transform::NormalizationTransform;
use crate::types::{LaneReading, PredictionResult};
use crate::validate;

pub const BATCH_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Ready,
    Unavailable { reason: String },
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready)
    }
}

/// Fast request check: the payload must be a list of exactly four records.
pub fn ensure_batch_shape(payload: &Value) -> Result<&[Value], PredictError> {
    match payload.as_array() {
        Some(records) if records.len() == BATCH_SIZE => Ok(records),
        Some(records) => Err(PredictError::InvalidBatchShape {
            found: format!("{} records", records.len()),
        }),
        None => Err(PredictError::InvalidBatchShape {
            found: json_kind(payload).to_string(),
        }),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Owns the loaded artifacts and runs whole batches. Share it by reference or
/// `Arc`; nothing inside is mutated after construction.
pub struct TrafficPredictor {
    model: Option<Arc<dyn RegressionModel>>,
    transform: Option<Arc<NormalizationTransform>>,
    missing: Vec<String>,
    policy: DecisionPolicy,
    strict_validation: bool,
    log_features: bool,
}

impl TrafficPredictor {
    /// A ready predictor over in-memory artifacts.
    pub fn new(
        model: Arc<dyn RegressionModel>,
        transform: Arc<NormalizationTransform>,
        policy: DecisionPolicy,
    ) -> Self {
        Self {
            model: Some(model),
            transform: Some(transform),
            missing: Vec::new(),
            policy,
            strict_validation: false,
            log_features: false,
        }
    }

    /// A predictor with no artifacts; every batch fails with `ModelUnavailable`.
    pub fn unavailable(reason: impl Into<String>, policy: DecisionPolicy) -> Self {
        Self {
            model: None,
            transform: None,
            missing: vec![reason.into()],
            policy,
            strict_validation: false,
            log_features: false,
        }
    }

    /// Load both artifacts named in `cfg`. A missing or broken artifact is
    /// logged and leaves the predictor unavailable rather than failing here.
    pub fn load(cfg: &Config) -> Self {
        let mut missing = Vec::new();

        let model_path = resolve_artifact_path(&cfg.model_path);
        let model = match model::load_model(&model_path) {
            Ok(m) => {
                info!("loaded model from {} ({})", model_path.display(), m.describe());
                Some(m)
            }
            Err(e) => {
                warn!("model not loaded: {:#}", e);
                missing.push(format!("model: {:#}", e));
                None
            }
        };

        let transform_path = resolve_artifact_path(&cfg.transform_path);
        let transform = match NormalizationTransform::load(&transform_path) {
            Ok(t) => {
                info!("loaded transform from {}", transform_path.display());
                Some(Arc::new(t))
            }
            Err(e) => {
                warn!("transform not loaded: {:#}", e);
                missing.push(format!("transform: {:#}", e));
                None
            }
        };

        Self {
            model,
            transform,
            missing,
            policy: cfg.policy,
            strict_validation: cfg.strict_validation,
            log_features: cfg.log_features,
        }
    }

    pub fn with_strict_validation(mut self, on: bool) -> Self {
        self.strict_validation = on;
        self
    }

    pub fn with_feature_logging(mut self, on: bool) -> Self {
        self.log_features = on;
        self
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn availability(&self) -> Availability {
        if self.model.is_some() && self.transform.is_some() {
            Availability::Ready
        } else {
            Availability::Unavailable {
                reason: self.missing.join("; "),
            }
        }
    }

    fn artifacts(
        &self,
    ) -> Result<(&dyn RegressionModel, &NormalizationTransform), PredictError> {
        match (&self.model, &self.transform) {
            (Some(m), Some(t)) => Ok((m.as_ref(), t.as_ref())),
            _ => Err(PredictError::ModelUnavailable {
                reason: self.missing.join("; "),
            }),
        }
    }

    /// Predict from an untyped payload, as handed over by the request layer.
    pub fn predict_batch(&self, payload: &Value) -> Result<PredictionResult, PredictError> {
        let records = ensure_batch_shape(payload)?;

        if self.strict_validation {
            let errors = validate::validate_batch(payload);
            if !errors.is_empty() {
                return Err(PredictError::InvalidReading(errors));
            }
        }
        self.artifacts()?;

        let readings = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                LaneReading::deserialize(r)
                    .map_err(|e| PredictError::failure(format!("record {}: {}", i + 1, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.predict_readings(&readings)
    }

    /// Predict from typed readings. Lanes 0-1 are east-west, 2-3 south-north.
    pub fn predict_readings(
        &self,
        readings: &[LaneReading],
    ) -> Result<PredictionResult, PredictError> {
        let readings: &[LaneReading; BATCH_SIZE] =
            readings
                .try_into()
                .map_err(|_| PredictError::InvalidBatchShape {
                    found: format!("{} records", readings.len()),
                })?;

        let raw = self.raw_predictions(readings)?;
        let lanes = self.policy.clip_all(&raw);
        let result = self.policy.pair(&lanes);
        debug!("raw={:?} clipped={:?}", raw, lanes);
        info!(
            "prediction east_west={}s south_north={}s",
            result.east_west_seconds, result.south_north_seconds
        );
        Ok(result)
    }

    /// Unclipped model output, one value per lane.
    pub fn raw_predictions(
        &self,
        readings: &[LaneReading; BATCH_SIZE],
    ) -> Result<[f64; BATCH_SIZE], PredictError> {
        let (model, transform) = self.artifacts()?;

        let features = FeatureEngineer::new(transform).engineer_batch(readings);
        if self.log_features {
            for (i, row) in features.rows().into_iter().enumerate() {
                debug!("lane {} {}", i, FeatureSummary::of(&row.to_vec()));
            }
        }

        let preds = model
            .predict(features.view())
            .map_err(|e| PredictError::failure(format!("{:#}", e)))?;
        let raw: [f64; BATCH_SIZE] = preds.as_slice().try_into().map_err(|_| {
            PredictError::failure(format!(
                "model returned {} predictions for {} readings",
                preds.len(),
                BATCH_SIZE
            ))
        })?;
        if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
            return Err(PredictError::failure(format!(
                "model produced a non-finite value: {}",
                bad
            )));
        }
        Ok(raw)
    }
}
