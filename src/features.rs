//! Raw lane reading -> model input row.
//!
//! Steps run in a fixed order: sensor one-hot, composite features,
//! standardization, manual reweighting, schema ordering with zero fill.
//! Out-of-range or unknown inputs are never rejected here; they flow through
//! as zeros or as whatever the arithmetic yields.

use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;
use std::fmt;

use crate::schema::{self, FEATURE_COUNT, FEATURE_NAMES, SCALED_FEATURES};
use crate::transform::{NormalizationTransform, SCALED_COUNT};
use crate::types::{LaneReading, SensorId};

/// Post-standardization multipliers the model was trained with.
/// Columns not listed keep a factor of 1.0.
const REWEIGHTING: [(&str, f64); 19] = [
    ("Volume_M", 2.5),
    ("Volume_S", 2.5),
    ("Volume_L", 2.5),
    ("Volume_T", 2.5),
    ("Speed", 3.0),
    ("Speed_M", 2.5),
    ("Speed_S", 2.5),
    ("Speed_L", 2.5),
    ("Speed_T", 2.5),
    ("IsPeakHour", 0.6),
    ("Hour", 0.8),
    ("DayOfWeek", 0.9),
    ("Minute", 0.7),
    ("Second", 0.7),
    ("Flow_Speed_Index", 2.0),
    ("Volume_Weighted_Speed", 1.5),
    ("Congestion_Index", 2.0),
    ("Throughput_Potential", 1.5),
    ("Flow_Speed_Balance", 2.0),
];

pub fn reweight_factor(column: &str) -> f64 {
    REWEIGHTING
        .iter()
        .find(|(name, _)| *name == column)
        .map_or(1.0, |(_, f)| *f)
}

/// Derived traffic-state features, computed from raw (unscaled) values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composites {
    pub flow_speed_index: f64,
    pub volume_weighted_speed: f64,
    pub congestion_index: f64,
    pub throughput_potential: f64,
    pub flow_speed_balance: f64,
}

impl Composites {
    pub fn from_reading(r: &LaneReading) -> Self {
        let (vs, vm, vl) = (
            r.volume_small as f64,
            r.volume_medium as f64,
            r.volume_large as f64,
        );
        // special-class vehicles are left out of the total
        let total_volume = vs + vm + vl;

        Self {
            flow_speed_index: (total_volume + 0.1) / (r.speed + 0.1),
            volume_weighted_speed: (vs * r.speed_small + vm * r.speed_medium + vl * r.speed_large)
                / (total_volume + 0.1),
            congestion_index: r.occupancy * (total_volume + 1.0) * (50.0 - r.speed).max(0.0)
                / 100.0,
            throughput_potential: r.volume_special as f64 * r.speed_special / (100.0 + 0.1),
            flow_speed_balance: (total_volume + 0.1) / (r.speed + 1.0),
        }
    }
}

/// Unscaled values for every standardized column, in [`SCALED_FEATURES`] order.
fn scaled_inputs(r: &LaneReading, c: &Composites) -> [f64; SCALED_COUNT] {
    [
        r.speed,
        r.occupancy,
        r.volume_medium as f64,
        r.volume_small as f64,
        r.volume_large as f64,
        r.volume_special as f64,
        r.speed_medium,
        r.speed_small,
        r.speed_large,
        r.speed_special,
        r.day_of_week as f64,
        r.hour as f64,
        r.minute as f64,
        r.second as f64,
        r.lane_id as f64,
        r.lane_type as f64,
        if r.is_peak_hour { 1.0 } else { 0.0 },
        c.flow_speed_index,
        c.volume_weighted_speed,
        c.congestion_index,
        c.throughput_potential,
        c.flow_speed_balance,
    ]
}

pub struct FeatureEngineer<'a> {
    transform: &'a NormalizationTransform,
}

impl<'a> FeatureEngineer<'a> {
    pub fn new(transform: &'a NormalizationTransform) -> Self {
        Self { transform }
    }

    /// Engineer one reading into a row in model input order.
    pub fn engineer(&self, reading: &LaneReading) -> Vec<f64> {
        let mut cols: HashMap<&'static str, f64> = HashMap::with_capacity(FEATURE_COUNT);

        // 1. one-hot; an unknown id leaves every indicator at 0
        let sensor = reading.sensor();
        for id in SensorId::ALL {
            cols.insert(id.column(), if sensor == Some(id) { 1.0 } else { 0.0 });
        }

        // 2. composites on raw values
        let composites = Composites::from_reading(reading);

        // 3. standardize
        let mut values = scaled_inputs(reading, &composites);
        self.transform.apply(&mut values);

        // 4. reweight
        for (name, v) in SCALED_FEATURES.iter().zip(values) {
            cols.insert(*name, v * reweight_factor(name));
        }

        // 5. schema order, zero fill
        schema::order_from_map(&cols)
    }

    /// Rows in reading order; columns in [`FEATURE_NAMES`] order.
    pub fn engineer_batch(&self, readings: &[LaneReading]) -> Array2<f64> {
        let mut out = Array2::zeros((readings.len(), FEATURE_COUNT));
        for (mut row, reading) in out.rows_mut().into_iter().zip(readings) {
            let v = self.engineer(reading);
            row.assign(&ArrayView1::from(&v[..]));
        }
        out
    }
}

/// Quick health view of an engineered row, for confirming the model is not
/// being fed all zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSummary {
    pub len: usize,
    pub nonzero: usize,
    pub mean: f64,
    pub std: f64,
    pub sample: Vec<(&'static str, f64)>,
}

impl FeatureSummary {
    pub fn of(row: &[f64]) -> Self {
        let len = row.len();
        let nonzero = row.iter().filter(|x| **x != 0.0).count();
        let mean = if len == 0 {
            0.0
        } else {
            row.iter().sum::<f64>() / len as f64
        };
        let std = if len < 2 {
            0.0
        } else {
            (row.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / len as f64).sqrt()
        };
        let sample = FEATURE_NAMES
            .iter()
            .copied()
            .zip(row.iter().copied())
            .take(6)
            .collect();
        Self {
            len,
            nonzero,
            mean,
            std,
            sample,
        }
    }
}

impl fmt::Display for FeatureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sample: Vec<String> = self
            .sample
            .iter()
            .map(|(name, v)| format!("{}={:.3}", name, v))
            .collect();
        write!(
            f,
            "in_dim={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
            self.len,
            self.nonzero,
            self.mean,
            self.std,
            sample.join(", ")
        )
    }
}
