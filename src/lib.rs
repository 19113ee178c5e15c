//! Green-light timing from four-lane detector readings.
//!
//! A batch of four [`LaneReading`]s is engineered into model rows, scored by a
//! pre-trained [`RegressionModel`], and turned into east-west / south-north
//! green times by a [`DecisionPolicy`]. [`TrafficPredictor`] ties it together.

pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod policy;
pub mod predictor;
pub mod schema;
pub mod transform;
pub mod types;
pub mod validate;

pub use config::Config;
pub use error::PredictError;
pub use features::FeatureEngineer;
pub use model::{DenseModel, RegressionModel};
pub use policy::DecisionPolicy;
pub use predictor::{ensure_batch_shape, Availability, TrafficPredictor};
pub use transform::NormalizationTransform;
pub use types::{Axis, Direction, LaneReading, PredictionResult, SensorId};
