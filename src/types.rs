use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Vehicle detector identifiers known to the trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorId {
    #[serde(rename = "VLRJM60")]
    Vlrjm60,
    #[serde(rename = "VLRJX00")]
    Vlrjx00,
    #[serde(rename = "VLRJX20")]
    Vlrjx20,
}

impl SensorId {
    /// Indicator column order (alphabetical, as the encoder emitted them at training time).
    pub const ALL: [SensorId; 3] = [SensorId::Vlrjm60, SensorId::Vlrjx00, SensorId::Vlrjx20];

    pub fn code(self) -> &'static str {
        match self {
            SensorId::Vlrjm60 => "VLRJM60",
            SensorId::Vlrjx00 => "VLRJX00",
            SensorId::Vlrjx20 => "VLRJX20",
        }
    }

    /// Name of this sensor's one-hot column in the model input.
    pub fn column(self) -> &'static str {
        match self {
            SensorId::Vlrjm60 => "VD_ID_VLRJM60",
            SensorId::Vlrjx00 => "VD_ID_VLRJX00",
            SensorId::Vlrjx20 => "VD_ID_VLRJX20",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        SensorId::ALL.into_iter().find(|id| id.code() == code)
    }

    pub fn direction(self) -> Direction {
        match self {
            SensorId::Vlrjx20 => Direction::East,
            SensorId::Vlrjm60 => Direction::West,
            SensorId::Vlrjx00 => Direction::SouthNorth,
        }
    }

    pub fn axis(self) -> Axis {
        self.direction().axis()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    East,
    West,
    SouthNorth,
}

impl Direction {
    pub fn axis(self) -> Axis {
        match self {
            Direction::East | Direction::West => Axis::EastWest,
            Direction::SouthNorth => Axis::SouthNorth,
        }
    }
}

/// One of the two conflicting right-of-way groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    EastWest,
    SouthNorth,
}

/// One detector observation for a single lane.
///
/// Every field is optional on the wire: absent or `null` values fall back to
/// zero (or `false`, or an empty sensor id). Both snake_case names and the
/// upstream column names (`VD_ID`, `Volume_M`, ...) are accepted, but a record
/// may carry only one of the two for any field; giving both is a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaneReading {
    #[serde(default, alias = "VD_ID", deserialize_with = "string_like")]
    pub sensor_id: String,
    #[serde(default, alias = "DayOfWeek", deserialize_with = "int_like")]
    pub day_of_week: i64,
    #[serde(default, alias = "Hour", deserialize_with = "int_like")]
    pub hour: i64,
    #[serde(default, alias = "Minute", deserialize_with = "int_like")]
    pub minute: i64,
    #[serde(default, alias = "Second", deserialize_with = "int_like")]
    pub second: i64,
    #[serde(default, alias = "IsPeakHour", deserialize_with = "bool_like")]
    pub is_peak_hour: bool,
    #[serde(default, alias = "LaneID", deserialize_with = "int_like")]
    pub lane_id: i64,
    #[serde(default, alias = "LaneType", deserialize_with = "int_like")]
    pub lane_type: i64,
    #[serde(default, alias = "Speed", deserialize_with = "float_like")]
    pub speed: f64,
    #[serde(default, alias = "Occupancy", deserialize_with = "float_like")]
    pub occupancy: f64,
    #[serde(default, alias = "Volume_M", deserialize_with = "int_like")]
    pub volume_medium: i64,
    #[serde(default, alias = "Speed_M", deserialize_with = "float_like")]
    pub speed_medium: f64,
    #[serde(default, alias = "Volume_S", deserialize_with = "int_like")]
    pub volume_small: i64,
    #[serde(default, alias = "Speed_S", deserialize_with = "float_like")]
    pub speed_small: f64,
    #[serde(default, alias = "Volume_L", deserialize_with = "int_like")]
    pub volume_large: i64,
    #[serde(default, alias = "Speed_L", deserialize_with = "float_like")]
    pub speed_large: f64,
    // special-class vehicles are optional upstream
    #[serde(default, alias = "Volume_T", deserialize_with = "int_like")]
    pub volume_special: i64,
    #[serde(default, alias = "Speed_T", deserialize_with = "float_like")]
    pub speed_special: f64,
}

impl LaneReading {
    /// `None` for identifiers outside the known detector set.
    pub fn sensor(&self) -> Option<SensorId> {
        SensorId::parse(&self.sensor_id)
    }

    /// Record-level vehicle count across all four classes, saturating at the
    /// `i64` bounds.
    pub fn total_volume(&self) -> i64 {
        self.volume_medium
            .saturating_add(self.volume_small)
            .saturating_add(self.volume_large)
            .saturating_add(self.volume_special)
    }
}

/// Green-light durations for the two directional axes, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub east_west_seconds: u32,
    pub south_north_seconds: u32,
}

// ---------- lenient field decoding ----------

fn string_like<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        other => Err(de::Error::custom(format!("expected a string, got {other}"))),
    }
}

fn int_like<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(0),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
                _ => Err(de::Error::custom(format!("expected an integer, got {n}"))),
            }
        }
        other => Err(de::Error::custom(format!("expected an integer, got {other}"))),
    }
}

fn float_like<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom(format!("expected a number, got {n}"))),
        other => Err(de::Error::custom(format!("expected a number, got {other}"))),
    }
}

fn bool_like<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().map_or(false, |f| f != 0.0)),
        other => Err(de::Error::custom(format!("expected a boolean, got {other}"))),
    }
}
