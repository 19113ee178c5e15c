#![allow(dead_code)]

use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView2};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use traffic_signal::{
    DecisionPolicy, LaneReading, NormalizationTransform, RegressionModel, TrafficPredictor,
};

pub fn reference_batch() -> Value {
    serde_json::from_str(include_str!("../fixtures/reference_batch.json"))
        .expect("fixture should be valid json")
}

pub fn reference_readings() -> Vec<LaneReading> {
    serde_json::from_value(reference_batch()).expect("fixture should decode")
}

/// Returns the same raw values whatever the input.
pub struct FixedModel(pub Vec<f64>);

impl RegressionModel for FixedModel {
    fn predict(&self, _features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        Ok(self.0.clone())
    }
}

/// Sums each row, and keeps a copy of everything it was fed.
#[derive(Default)]
pub struct RecordingModel {
    pub seen: Mutex<Vec<Array2<f64>>>,
}

impl RegressionModel for RecordingModel {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        self.seen.lock().unwrap().push(features.to_owned());
        Ok(features.rows().into_iter().map(|r| r.sum()).collect())
    }
}

pub struct FailingModel;

impl RegressionModel for FailingModel {
    fn predict(&self, _features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        bail!("tensor shape exploded")
    }
}

pub fn predictor_with(model: impl RegressionModel + 'static) -> TrafficPredictor {
    TrafficPredictor::new(
        Arc::new(model),
        Arc::new(NormalizationTransform::identity()),
        DecisionPolicy::default(),
    )
}
