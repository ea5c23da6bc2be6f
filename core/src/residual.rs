//! Residual risk calculator.
//!
//! Sums the reduction quadrants of every control on a risk and walks the
//! inherent (probability, impact) cell down the matrix by that many steps.
//!
//! INVARIANTS (both policies):
//!   - Residual probability and impact stay inside 1..=5.
//!   - residual score <= inherent score.
//!   - More total reduction never yields a higher residual score.

use crate::{
    control::RiskControl,
    error::QuantResult,
    types::{GridPosition, MatrixScore, GRID_MIN},
};
use serde::{Deserialize, Serialize};

/// How a total quadrant reduction is spent on the two axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualPolicy {
    /// One step at a time off whichever axis is larger (probability on ties).
    #[default]
    GreedyDiagonal,
    /// Up to two steps off probability, the remainder off impact.
    ProbabilityFirst,
}

/// Most steps `ProbabilityFirst` takes off the probability axis.
const PROBABILITY_FIRST_CAP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidualRisk {
    pub probability: u8,
    pub impact: u8,
    pub score: MatrixScore,
}

impl ResidualRisk {
    pub fn position(&self) -> GridPosition {
        GridPosition {
            probability: self.probability,
            impact: self.impact,
        }
    }
}

impl From<GridPosition> for ResidualRisk {
    fn from(pos: GridPosition) -> Self {
        Self {
            probability: pos.probability,
            impact: pos.impact,
            score: pos.score(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResidualRiskCalculator {
    policy: ResidualPolicy,
}

impl ResidualRiskCalculator {
    pub fn new(policy: ResidualPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ResidualPolicy {
        self.policy
    }

    pub fn total_reduction(controls: &[RiskControl]) -> u32 {
        controls
            .iter()
            .map(|c| c.reduction_quadrants() as u32)
            .sum()
    }

    pub fn calculate(
        &self,
        inherent: GridPosition,
        controls: &[RiskControl],
    ) -> QuantResult<ResidualRisk> {
        inherent.validate()?;
        let total = Self::total_reduction(controls);
        let residual = self.apply_reduction(inherent, total);

        log::debug!(
            "residual: inherent=({},{}) controls={} reduction={} policy={:?} -> ({},{})",
            inherent.probability,
            inherent.impact,
            controls.len(),
            total,
            self.policy,
            residual.probability,
            residual.impact
        );

        Ok(ResidualRisk::from(residual))
    }

    /// Move `inherent` down the matrix by `total` quadrants.
    /// `inherent` must already be a valid grid cell.
    pub fn apply_reduction(&self, inherent: GridPosition, total: u32) -> GridPosition {
        match self.policy {
            ResidualPolicy::GreedyDiagonal => greedy_diagonal(inherent, total),
            ResidualPolicy::ProbabilityFirst => probability_first(inherent, total),
        }
    }
}

fn greedy_diagonal(inherent: GridPosition, total: u32) -> GridPosition {
    let GridPosition {
        mut probability,
        mut impact,
    } = inherent;

    for _ in 0..total {
        if probability == GRID_MIN && impact == GRID_MIN {
            break;
        }
        // probability >= impact here implies probability > GRID_MIN
        if probability >= impact {
            probability -= 1;
        } else {
            impact -= 1;
        }
    }

    GridPosition {
        probability,
        impact,
    }
}

fn probability_first(inherent: GridPosition, total: u32) -> GridPosition {
    let probability_steps = total.min(PROBABILITY_FIRST_CAP);
    let impact_steps = total - probability_steps;

    GridPosition {
        probability: step_down(inherent.probability, probability_steps),
        impact: step_down(inherent.impact, impact_steps),
    }
}

fn step_down(value: u8, steps: u32) -> u8 {
    let floor = GRID_MIN as u32;
    (value as u32).saturating_sub(steps).max(floor) as u8
}
