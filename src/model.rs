use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, ArrayView2};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};

use crate::schema::{self, FEATURE_COUNT};

/// A fitted regression model: one raw green-time estimate per input row.
///
/// Implementations hold read-only weights and must tolerate concurrent calls.
pub trait RegressionModel: Send + Sync {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>>;

    fn describe(&self) -> String {
        "regression model".to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: &mut Array2<f64>) {
        match self {
            Activation::Linear => {}
            Activation::Relu => x.mapv_inplace(|v| v.max(0.0)),
            Activation::Sigmoid => x.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
            Activation::Tanh => x.mapv_inplace(f64::tanh),
        }
    }
}

#[derive(Deserialize)]
struct LayerJson {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(default)]
    activation: Activation,
}

#[derive(Deserialize)]
struct DenseJson {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    layers: Vec<LayerJson>,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    // [in, out], same layout as a Keras Dense kernel
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

/// Feed-forward network exported layer by layer from the training run.
#[derive(Debug, Clone)]
pub struct DenseModel {
    layers: Vec<DenseLayer>,
}

impl DenseModel {
    pub fn from_json_str(txt: &str) -> Result<Self> {
        let raw: DenseJson = serde_json::from_str(txt).context("failed to parse model json")?;

        if let Some(names) = &raw.feature_names {
            if !schema::matches_feature_order(names) {
                bail!("model feature_names do not match the feature schema");
            }
        }
        if raw.layers.is_empty() {
            bail!("model has no layers");
        }

        let mut layers = Vec::with_capacity(raw.layers.len());
        let mut width = FEATURE_COUNT;
        for (i, l) in raw.layers.into_iter().enumerate() {
            let rows = l.weights.len();
            let cols = l.weights.first().map_or(0, Vec::len);
            if rows != width {
                bail!("layer {}: expects {} inputs, previous width is {}", i, rows, width);
            }
            if cols == 0 || l.weights.iter().any(|r| r.len() != cols) {
                bail!("layer {}: ragged or empty weight matrix", i);
            }
            if l.bias.len() != cols {
                bail!("layer {}: bias has {} entries, expected {}", i, l.bias.len(), cols);
            }
            let flat: Vec<f64> = l.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((rows, cols), flat)
                .with_context(|| format!("layer {}: bad weight shape", i))?;
            layers.push(DenseLayer {
                weights,
                bias: Array1::from(l.bias),
                activation: l.activation,
            });
            width = cols;
        }
        if width != 1 {
            bail!("model output width is {}, expected 1", width);
        }

        Ok(Self { layers })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model at {}", path.display()))?;
        Self::from_json_str(&txt)
            .with_context(|| format!("invalid model artifact {}", path.display()))
    }
}

impl RegressionModel for DenseModel {
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        if features.ncols() != FEATURE_COUNT {
            bail!(
                "feature length mismatch: got {}, expected {}",
                features.ncols(),
                FEATURE_COUNT
            );
        }
        let mut x = features.to_owned();
        for layer in &self.layers {
            x = x.dot(&layer.weights) + &layer.bias;
            layer.activation.apply(&mut x);
        }
        Ok(x.column(0).to_vec())
    }

    fn describe(&self) -> String {
        let widths: Vec<String> = self
            .layers
            .iter()
            .map(|l| l.weights.ncols().to_string())
            .collect();
        format!("dense {}->{}", FEATURE_COUNT, widths.join("->"))
    }
}

#[cfg(feature = "torch")]
pub use torch::TorchModel;

#[cfg(feature = "torch")]
mod torch {
    use super::*;
    use tch::{kind::Kind, CModule, Device, Tensor};

    /// TorchScript export of the regressor.
    pub struct TorchModel {
        model: CModule,
        device: Device,
    }

    impl TorchModel {
        pub fn load(path: &Path) -> Result<Self> {
            let device = Device::Cpu;
            let model = CModule::load_on_device(path, device)
                .with_context(|| format!("failed to load TorchScript {}", path.display()))?;
            Ok(Self { model, device })
        }
    }

    impl RegressionModel for TorchModel {
        fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
            let rows = features.nrows();
            if features.ncols() != FEATURE_COUNT {
                bail!(
                    "feature length mismatch: got {}, expected {}",
                    features.ncols(),
                    FEATURE_COUNT
                );
            }
            let flat: Vec<f32> = features.iter().map(|v| *v as f32).collect();
            let input = Tensor::from_slice(&flat)
                .reshape([rows as i64, FEATURE_COUNT as i64])
                .to_device(self.device);

            // [B] or [B, 1]
            let t = self.model.forward_ts(&[input])?;
            let sz = t.size();
            let ok = match sz.as_slice() {
                [b] => *b == rows as i64,
                [b, 1] => *b == rows as i64,
                _ => false,
            };
            if !ok {
                bail!("unexpected model output size: {:?}", sz);
            }
            let out = t.to_kind(Kind::Double).reshape([-1]);
            Ok(Vec::<f64>::try_from(&out)?)
        }

        fn describe(&self) -> String {
            "torchscript".to_string()
        }
    }
}

/// Load a model artifact, picking the backend from the file extension.
pub fn load_model(path: &Path) -> Result<Arc<dyn RegressionModel>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let model: Arc<dyn RegressionModel> = match ext {
        "pt" | "ts" => load_torchscript(path)?,
        _ => Arc::new(DenseModel::load(path)?),
    };
    warmup(model.as_ref())?;
    Ok(model)
}

#[cfg(feature = "torch")]
fn load_torchscript(path: &Path) -> Result<Arc<dyn RegressionModel>> {
    Ok(Arc::new(TorchModel::load(path)?))
}

#[cfg(not(feature = "torch"))]
fn load_torchscript(path: &Path) -> Result<Arc<dyn RegressionModel>> {
    bail!(
        "{} is a TorchScript model; rebuild with the `torch` feature",
        path.display()
    )
}

/// One forward pass on a zero row: the model must answer with a single finite value.
pub fn warmup(model: &dyn RegressionModel) -> Result<()> {
    let probe = Array2::<f64>::zeros((1, FEATURE_COUNT));
    let out = model.predict(probe.view()).context("warmup forward failed")?;
    match out.as_slice() {
        [v] if v.is_finite() => {
            tracing::info!("warmup forward ok ({})", model.describe());
            Ok(())
        }
        _ => bail!("warmup produced {:?}, expected one finite value", out),
    }
}
