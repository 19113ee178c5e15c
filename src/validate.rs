//! Strict per-field checks on raw lane records.
//!
//! The live prediction path only runs these when `strict_validation` is on;
//! by default malformed fields are defaulted instead of rejected.

use serde_json::{Map, Value};

use crate::types::SensorId;

/// (upstream name, snake_case name) of every field a record must carry.
const REQUIRED_FIELDS: [(&str, &str); 16] = [
    ("VD_ID", "sensor_id"),
    ("DayOfWeek", "day_of_week"),
    ("Hour", "hour"),
    ("Minute", "minute"),
    ("Second", "second"),
    ("IsPeakHour", "is_peak_hour"),
    ("LaneID", "lane_id"),
    ("LaneType", "lane_type"),
    ("Speed", "speed"),
    ("Occupancy", "occupancy"),
    ("Volume_M", "volume_medium"),
    ("Speed_M", "speed_medium"),
    ("Volume_S", "volume_small"),
    ("Speed_S", "speed_small"),
    ("Volume_L", "volume_large"),
    ("Speed_L", "speed_large"),
];

const OPTIONAL_FIELDS: [(&str, &str); 2] = [
    ("Volume_T", "volume_special"),
    ("Speed_T", "speed_special"),
];

const VOLUME_FIELDS: [(&str, &str); 4] = [
    ("Volume_M", "volume_medium"),
    ("Volume_S", "volume_small"),
    ("Volume_L", "volume_large"),
    ("Volume_T", "volume_special"),
];

fn field<'a>(obj: &'a Map<String, Value>, upstream: &str, snake: &str) -> Option<&'a Value> {
    obj.get(upstream).or_else(|| obj.get(snake))
}

/// Numeric value of a field; absent counts as `default`.
fn number(
    obj: &Map<String, Value>,
    upstream: &str,
    snake: &str,
    default: f64,
    errors: &mut Vec<String>,
) -> Option<f64> {
    match field(obj, upstream, snake) {
        None | Some(Value::Null) => Some(default),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(_) => {
            errors.push(format!("{} must be a number", upstream));
            None
        }
    }
}

fn check_range(
    obj: &Map<String, Value>,
    (upstream, snake): (&str, &str),
    lo: f64,
    hi: f64,
    errors: &mut Vec<String>,
) {
    // absent fields fall out of range on purpose, like a default of -1
    if let Some(v) = number(obj, upstream, snake, lo - 1.0, errors) {
        if !(lo..=hi).contains(&v) {
            errors.push(format!("{} must be between {} and {}", upstream, lo, hi));
        }
    }
}

/// Every violation found in one record.
pub fn validate_reading(record: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(obj) = record.as_object() else {
        errors.push("record must be an object".to_string());
        return errors;
    };

    for (upstream, snake) in REQUIRED_FIELDS {
        if field(obj, upstream, snake).is_none() {
            errors.push(format!("missing required field: {}", upstream));
        }
    }

    // the record decoder refuses a field given under both names
    for (upstream, snake) in REQUIRED_FIELDS.into_iter().chain(OPTIONAL_FIELDS) {
        if obj.contains_key(upstream) && obj.contains_key(snake) {
            errors.push(format!("{} given twice (also as {})", upstream, snake));
        }
    }

    let sensor = field(obj, "VD_ID", "sensor_id");
    if sensor.and_then(Value::as_str).and_then(SensorId::parse).is_none() {
        let shown = sensor.map_or_else(|| "null".to_string(), Value::to_string);
        errors.push(format!("unknown VD_ID: {}", shown));
    }

    // DayOfWeek defaults to 0 when absent, every other range to -1
    if let Some(v) = number(obj, "DayOfWeek", "day_of_week", 0.0, &mut errors) {
        if !(1.0..=7.0).contains(&v) {
            errors.push("DayOfWeek must be between 1 and 7".to_string());
        }
    }
    check_range(obj, ("Hour", "hour"), 0.0, 23.0, &mut errors);
    check_range(obj, ("Minute", "minute"), 0.0, 59.0, &mut errors);
    check_range(obj, ("Second", "second"), 0.0, 59.0, &mut errors);

    if let Some(v) = number(obj, "Speed", "speed", -1.0, &mut errors) {
        if v < 0.0 {
            errors.push("Speed must not be negative".to_string());
        }
    }
    check_range(obj, ("Occupancy", "occupancy"), 0.0, 100.0, &mut errors);

    for (upstream, snake) in VOLUME_FIELDS {
        if let Some(v) = number(obj, upstream, snake, 0.0, &mut errors) {
            if v < 0.0 {
                errors.push(format!("{} must not be negative", upstream));
            }
        }
    }

    errors
}

/// Shape check plus per-record checks, each message prefixed with the record's
/// 1-based position.
pub fn validate_batch(payload: &Value) -> Vec<String> {
    let Some(records) = payload.as_array() else {
        return vec!["batch must be a list".to_string()];
    };
    if records.len() != 4 {
        return vec![format!(
            "batch must contain exactly 4 lane readings, got {}",
            records.len()
        )];
    }
    records
        .iter()
        .enumerate()
        .flat_map(|(i, r)| {
            validate_reading(r)
                .into_iter()
                .map(move |e| format!("record {}: {}", i + 1, e))
        })
        .collect()
}
