//! Shared primitive types used across the quantification core.

use crate::error::{QuantError, QuantResult};
use serde::{Deserialize, Serialize};

/// Lowest cell on either axis of the risk matrix.
pub const GRID_MIN: u8 = 1;

/// Highest cell on either axis of the risk matrix.
pub const GRID_MAX: u8 = 5;

/// A probability×impact product on the 5×5 matrix (1..=25).
///
/// Wider than the axes so an unvalidated position cannot overflow.
pub type MatrixScore = u16;

/// A cell on the probability×impact matrix.
///
/// Construct through `new` / `from_raw` so both axes are known to be
/// inside `GRID_MIN..=GRID_MAX`. Deserialized values must be passed
/// through `validate()` before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPosition {
    pub probability: u8,
    pub impact: u8,
}

impl GridPosition {
    pub fn new(probability: u8, impact: u8) -> QuantResult<Self> {
        let pos = Self { probability, impact };
        pos.validate()?;
        Ok(pos)
    }

    /// Build from untrusted integers (wire payloads, database rows).
    pub fn from_raw(probability: i64, impact: i64) -> QuantResult<Self> {
        let probability = check_axis("probability", probability)?;
        let impact = check_axis("impact", impact)?;
        Ok(Self { probability, impact })
    }

    pub fn validate(&self) -> QuantResult<()> {
        check_axis("probability", self.probability as i64)?;
        check_axis("impact", self.impact as i64)?;
        Ok(())
    }

    pub fn score(&self) -> MatrixScore {
        self.probability as MatrixScore * self.impact as MatrixScore
    }
}

fn check_axis(axis: &'static str, value: i64) -> QuantResult<u8> {
    if (GRID_MIN as i64..=GRID_MAX as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(QuantError::InvalidGridPosition { axis, value })
    }
}
