//! Risk matrix classification.
//!
//! A probability×impact score maps to Low / Medium / High / Critical
//! through a threshold scheme. More than one scheme is in use across the
//! product, so schemes are named configuration and every lookup names the
//! scheme it wants. There is no implicit default.

use crate::{
    config::RiskMatrixConfig,
    error::{QuantError, QuantResult},
    types::{GridPosition, GRID_MAX, GRID_MIN},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest score the 5×5 matrix can produce.
pub const MAX_MATRIX_SCORE: u8 = GRID_MAX * GRID_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Inclusive lower bounds of each level above Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdScheme {
    pub medium: u8,
    pub high: u8,
    pub critical: u8,
}

impl ThresholdScheme {
    /// Critical from 15 (register evaluation and scenario library views).
    pub const STANDARD: ThresholdScheme = ThresholdScheme {
        medium: 5,
        high: 9,
        critical: 15,
    };

    /// Critical from 19 (risk detail view).
    pub const EXECUTIVE: ThresholdScheme = ThresholdScheme {
        medium: 7,
        high: 13,
        critical: 19,
    };

    /// Thresholds must be strictly ascending and inside 2..=25.
    pub fn validate(&self, name: &str) -> QuantResult<()> {
        let ascending = self.medium < self.high && self.high < self.critical;
        let in_range = self.medium > GRID_MIN && self.critical <= MAX_MATRIX_SCORE;
        if !ascending || !in_range {
            return Err(QuantError::InvalidConfig(format!(
                "scheme '{name}' thresholds must ascend within 2..={MAX_MATRIX_SCORE}: \
                 medium={} high={} critical={}",
                self.medium, self.high, self.critical
            )));
        }
        Ok(())
    }

    /// Works on fractional scores too (simulation outputs).
    pub fn classify(&self, score: f64) -> RiskLevel {
        if score >= self.critical as f64 {
            RiskLevel::Critical
        } else if score >= self.high as f64 {
            RiskLevel::High
        } else if score >= self.medium as f64 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// The set of named threshold schemes a deployment recognises.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskMatrix {
    schemes: BTreeMap<String, ThresholdScheme>,
}

impl RiskMatrix {
    pub fn from_config(config: &RiskMatrixConfig) -> QuantResult<Self> {
        if config.schemes.is_empty() {
            return Err(QuantError::InvalidConfig(
                "risk matrix needs at least one threshold scheme".into(),
            ));
        }
        for (name, scheme) in &config.schemes {
            scheme.validate(name)?;
        }
        Ok(Self {
            schemes: config.schemes.clone(),
        })
    }

    pub fn scheme(&self, name: &str) -> QuantResult<&ThresholdScheme> {
        self.schemes
            .get(name)
            .ok_or_else(|| QuantError::UnknownScheme {
                name: name.to_string(),
            })
    }

    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    pub fn classify(&self, scheme: &str, score: f64) -> QuantResult<RiskLevel> {
        Ok(self.scheme(scheme)?.classify(score))
    }

    pub fn classify_position(&self, scheme: &str, position: GridPosition) -> QuantResult<RiskLevel> {
        position.validate()?;
        self.classify(scheme, position.score() as f64)
    }
}

/// Coarse band of one matrix axis, used by the 3×3 heat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeatBand {
    Low,
    Medium,
    High,
}

impl HeatBand {
    pub const ALL: [HeatBand; 3] = [Self::Low, Self::Medium, Self::High];

    /// 1–2 Low, 3 Medium, 4–5 High.
    pub fn for_axis(value: u8) -> Self {
        match value {
            0..=2 => Self::Low,
            3 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

/// Heat map key such as `HIGH_MEDIUM` (probability band first).
pub fn heat_cell_key(probability: HeatBand, impact: HeatBand) -> String {
    format!("{}_{}", probability.as_str(), impact.as_str())
}
