//! Column contract between feature engineering and the trained model.
//!
//! Both orders below were fixed when the model and the normalization transform
//! were fitted. They differ from each other on purpose; do not reorder either
//! without re-exporting both artifacts.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Model input order.
pub const FEATURE_NAMES: [&str; 31] = [
    "Speed",
    "Occupancy",
    "Volume_M",
    "Volume_S",
    "Volume_L",
    "Volume_T",
    "Speed_M",
    "Speed_S",
    "Speed_L",
    "Speed_T",
    "LaneID",
    "LaneType",
    "Hour",
    "DayOfWeek",
    "Minute",
    "Second",
    "IsPeakHour",
    "VD_ID_VLRJM60",
    "VD_ID_VLRJX00",
    "VD_ID_VLRJX20",
    // interaction terms are never engineered; they stay zero
    "Occ_x_Volume_S",
    "Occ_x_Volume_L",
    "Occ_x_Volume_T",
    "SpeedS_x_VolumeS",
    "SpeedL_x_VolumeL",
    "SpeedT_x_VolumeT",
    "Flow_Speed_Index",
    "Volume_Weighted_Speed",
    "Congestion_Index",
    "Throughput_Potential",
    "Flow_Speed_Balance",
];

/// Columns the normalization transform was fitted on, in its fitted order.
pub const SCALED_FEATURES: [&str; 22] = [
    "Speed",
    "Occupancy",
    "Volume_M",
    "Volume_S",
    "Volume_L",
    "Volume_T",
    "Speed_M",
    "Speed_S",
    "Speed_L",
    "Speed_T",
    "DayOfWeek",
    "Hour",
    "Minute",
    "Second",
    "LaneID",
    "LaneType",
    "IsPeakHour",
    "Flow_Speed_Index",
    "Volume_Weighted_Speed",
    "Congestion_Index",
    "Throughput_Potential",
    "Flow_Speed_Balance",
];

/// Prefix of the one-hot sensor indicator columns.
pub const SENSOR_PREFIX: &str = "VD_ID_";

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Position of `name` in the model input order.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|n| *n == name)
}

pub fn sensor_columns() -> impl Iterator<Item = &'static str> {
    FEATURE_NAMES
        .iter()
        .copied()
        .filter(|n| n.starts_with(SENSOR_PREFIX))
}

/// Lay out a name -> value map in model order; missing names become 0.0.
pub fn order_from_map<K>(map: &HashMap<K, f64>) -> Vec<f64>
where
    K: Borrow<str> + Eq + Hash,
{
    FEATURE_NAMES
        .iter()
        .map(|k| map.get(*k).copied().unwrap_or(0.0))
        .collect()
}

/// True when `names` is exactly the model input order.
pub fn matches_feature_order<S: AsRef<str>>(names: &[S]) -> bool {
    names.len() == FEATURE_COUNT
        && names
            .iter()
            .zip(FEATURE_NAMES.iter())
            .all(|(a, b)| a.as_ref() == *b)
}
