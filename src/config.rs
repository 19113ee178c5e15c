use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::policy::DecisionPolicy;

pub const DEFAULT_MODEL_PATH: &str = "artifacts/trained_model.json";
pub const DEFAULT_TRANSFORM_PATH: &str = "artifacts/scaler.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: PathBuf,
    pub transform_path: PathBuf,
    pub policy: DecisionPolicy,
    /// Run the per-field validator before engineering.
    pub strict_validation: bool,
    /// Emit a debug summary of every engineered row.
    pub log_features: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            transform_path: PathBuf::from(DEFAULT_TRANSFORM_PATH),
            policy: DecisionPolicy::default(),
            strict_validation: false,
            log_features: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("invalid config json in {}", path.display()))
    }

    /// Defaults, then the optional file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `MODEL_PATH`, `TRANSFORM_PATH`, `STRICT_VALIDATION`, `LOG_FEATURES`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(p);
        }
        if let Some(p) = lookup("TRANSFORM_PATH") {
            self.transform_path = PathBuf::from(p);
        }
        if let Some(v) = lookup("STRICT_VALIDATION") {
            self.strict_validation = parse_flag("STRICT_VALIDATION", &v)?;
        }
        if let Some(v) = lookup("LOG_FEATURES") {
            self.log_features = parse_flag("LOG_FEATURES", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.policy.validate().context("invalid decision policy")
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{} must be a boolean flag, got {:?}", key, other),
    }
}

/// Resolve a relative artifact path: as given first, then next to the executable.
pub fn resolve_artifact_path(path: &Path) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(path);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    // fall back to the given path; the loader reports it missing
    path.to_path_buf()
}
