use crate::{
    error::{QuantError, QuantResult},
    residual::ResidualPolicy,
    risk_matrix::ThresholdScheme,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const STANDARD_SCHEME: &str = "standard";
pub const EXECUTIVE_SCHEME: &str = "executive";

/// Ceiling on `max_iterations`. No config file may lift it.
pub const HARD_MAX_ITERATIONS: u32 = 50_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMatrixConfig {
    pub schemes: BTreeMap<String, ThresholdScheme>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub min_iterations: u32,
    pub max_iterations: u32,
    pub default_iterations: u32,
    pub histogram_bins: usize,
    /// Draws between cancellation checks.
    pub cancel_check_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantConfig {
    pub risk_matrix: RiskMatrixConfig,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub residual_policy: ResidualPolicy,
}

impl QuantConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> QuantResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: QuantConfig = serde_json::from_str(&content)?;
        config.validate()?;
        log::debug!("config: loaded {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> QuantResult<Self> {
        let config: QuantConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults. Mirrors data/risk_quant.json.
    pub fn standard() -> Self {
        Self {
            risk_matrix: RiskMatrixConfig {
                schemes: [
                    (STANDARD_SCHEME.to_string(), ThresholdScheme::STANDARD),
                    (EXECUTIVE_SCHEME.to_string(), ThresholdScheme::EXECUTIVE),
                ]
                .into(),
            },
            simulation: SimulationConfig {
                min_iterations: 1_000,
                max_iterations: HARD_MAX_ITERATIONS,
                default_iterations: 10_000,
                histogram_bins: 20,
                cancel_check_interval: 1_000,
            },
            residual_policy: ResidualPolicy::GreedyDiagonal,
        }
    }

    pub fn validate(&self) -> QuantResult<()> {
        if self.risk_matrix.schemes.is_empty() {
            return Err(QuantError::InvalidConfig(
                "risk_matrix.schemes must not be empty".into(),
            ));
        }
        for (name, scheme) in &self.risk_matrix.schemes {
            scheme.validate(name)?;
        }

        let sim = &self.simulation;
        if sim.min_iterations == 0 || sim.min_iterations > sim.max_iterations {
            return Err(QuantError::InvalidConfig(format!(
                "simulation iteration bounds invalid: min={} max={}",
                sim.min_iterations, sim.max_iterations
            )));
        }
        if sim.max_iterations > HARD_MAX_ITERATIONS {
            return Err(QuantError::InvalidConfig(format!(
                "max_iterations {} exceeds the hard limit of {HARD_MAX_ITERATIONS}",
                sim.max_iterations
            )));
        }
        if !(sim.min_iterations..=sim.max_iterations).contains(&sim.default_iterations) {
            return Err(QuantError::InvalidConfig(format!(
                "default_iterations {} outside [{}, {}]",
                sim.default_iterations, sim.min_iterations, sim.max_iterations
            )));
        }
        if sim.histogram_bins == 0 {
            return Err(QuantError::InvalidConfig(
                "histogram_bins must be at least 1".into(),
            ));
        }
        if sim.cancel_check_interval == 0 {
            return Err(QuantError::InvalidConfig(
                "cancel_check_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
