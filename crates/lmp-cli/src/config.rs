//! User configuration for the `lmp` command.
//!
//! Stored in `~/.lmp/config.toml` (or the file given with `--config`).
//! Every key is optional; command-line flags override file values, and a
//! case file's own `value_of_lost_load` sits between the two.
//!
//! ```toml
//! [solver]
//! method = "dc"
//! max_iterations = 200
//! binding_tolerance = 1e-5
//! value_of_lost_load = 5000.0
//!
//! [output]
//! decimal_places = 2
//! format = "table"
//! congestion_threshold = 0.01
//!
//! [sweep]
//! steps = 11
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lmp_algo::opf::DEFAULT_ACTIVE_THRESHOLD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LmpConfig {
    pub solver: SolverConfig,
    pub output: OutputConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Dispatch method ("dc" or "merit")
    pub method: String,
    /// Interior-point iteration cap
    pub max_iterations: u32,
    /// Relative slack under which a line limit counts as binding
    pub binding_tolerance: f64,
    /// Load shedding price; shedding is off when unset
    pub value_of_lost_load: Option<f64>,
    /// Utilization at which a line counts as an active constraint
    pub active_threshold: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: "dc".to_string(),
            max_iterations: 200,
            binding_tolerance: 1e-5,
            value_of_lost_load: None,
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub decimal_places: usize,
    /// "table" or "json"
    pub format: String,
    /// Smallest congestion contribution shown in the price breakdown
    pub congestion_threshold: f64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            decimal_places: 2,
            format: "table".to_string(),
            congestion_threshold: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub steps: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { steps: 11 }
    }
}

impl LmpConfig {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".lmp"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Load from `explicit` if given (it must exist), else from the default
    /// location if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: LmpConfig = toml::from_str(
            r#"
            [solver]
            value_of_lost_load = 5000.0

            [output]
            decimal_places = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.solver.value_of_lost_load, Some(5000.0));
        assert_eq!(config.solver.method, "dc");
        assert_eq!(config.solver.max_iterations, 200);
        assert_eq!(config.output.decimal_places, 4);
        assert_eq!(config.output.format, "table");
        assert_eq!(config.sweep.steps, 11);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = LmpConfig::load(Some(Path::new("/nonexistent/lmp.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/lmp.toml"));
    }
}
