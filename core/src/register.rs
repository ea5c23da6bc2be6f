//! Risk assessments and register-level views.
//!
//! A `RiskAssessment` carries its inherent cell, its controls and the
//! residual cell derived from them. Every mutation recomputes the
//! residual, so the two can never disagree. The register helpers (heat
//! map, critical list, summary) are read-only views over a slice of
//! assessments supplied by the caller.

use crate::{
    control::{ControlAttributes, RiskControl},
    error::{QuantError, QuantResult},
    residual::{ResidualRisk, ResidualRiskCalculator},
    risk_matrix::{heat_cell_key, HeatBand, RiskLevel, ThresholdScheme},
    types::{GridPosition, MatrixScore},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub id: String,
    pub name: String,
    inherent: GridPosition,
    inherent_score: MatrixScore,
    controls: Vec<RiskControl>,
    residual: ResidualRisk,
}

impl RiskAssessment {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        inherent: GridPosition,
        calculator: &ResidualRiskCalculator,
    ) -> QuantResult<Self> {
        Self::with_controls(id, name, inherent, Vec::new(), calculator)
    }

    pub fn with_controls(
        id: impl Into<String>,
        name: impl Into<String>,
        inherent: GridPosition,
        controls: Vec<RiskControl>,
        calculator: &ResidualRiskCalculator,
    ) -> QuantResult<Self> {
        let residual = calculator.calculate(inherent, &controls)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            inherent,
            inherent_score: inherent.score(),
            controls,
            residual,
        })
    }

    pub fn inherent(&self) -> GridPosition {
        self.inherent
    }

    pub fn inherent_score(&self) -> MatrixScore {
        self.inherent_score
    }

    pub fn controls(&self) -> &[RiskControl] {
        &self.controls
    }

    pub fn residual(&self) -> ResidualRisk {
        self.residual
    }

    pub fn position(&self, stage: Stage) -> GridPosition {
        match stage {
            Stage::Inherent => self.inherent,
            Stage::Residual => self.residual.position(),
        }
    }

    pub fn score(&self, stage: Stage) -> MatrixScore {
        self.position(stage).score()
    }

    pub fn set_inherent(
        &mut self,
        inherent: GridPosition,
        calculator: &ResidualRiskCalculator,
    ) -> QuantResult<()> {
        let residual = calculator.calculate(inherent, &self.controls)?;
        self.inherent = inherent;
        self.inherent_score = inherent.score();
        self.residual = residual;
        Ok(())
    }

    pub fn add_control(
        &mut self,
        attributes: ControlAttributes,
        calculator: &ResidualRiskCalculator,
    ) -> QuantResult<&RiskControl> {
        self.controls.push(RiskControl::new(attributes));
        self.recompute(calculator)?;
        let last = self.controls.len() - 1;
        Ok(&self.controls[last])
    }

    pub fn edit_control(
        &mut self,
        index: usize,
        attributes: ControlAttributes,
        calculator: &ResidualRiskCalculator,
    ) -> QuantResult<()> {
        self.check_index(index)?;
        self.controls[index].edit(attributes);
        self.recompute(calculator)
    }

    pub fn remove_control(
        &mut self,
        index: usize,
        calculator: &ResidualRiskCalculator,
    ) -> QuantResult<RiskControl> {
        self.check_index(index)?;
        let removed = self.controls.remove(index);
        self.recompute(calculator)?;
        Ok(removed)
    }

    fn check_index(&self, index: usize) -> QuantResult<()> {
        if index < self.controls.len() {
            Ok(())
        } else {
            Err(QuantError::InvalidInput {
                field: "controlIndex",
                value: index.to_string(),
            })
        }
    }

    fn recompute(&mut self, calculator: &ResidualRiskCalculator) -> QuantResult<()> {
        self.residual = calculator.calculate(self.inherent, &self.controls)?;
        Ok(())
    }
}

/// Which side of the controls to read a position from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Inherent,
    Residual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatMapEntry {
    pub id: String,
    pub name: String,
    pub probability: u8,
    pub impact: u8,
    pub score: MatrixScore,
}

/// 3×3 bucketing of a register, keyed `PROBABILITY_IMPACT` (e.g. `HIGH_LOW`).
/// All nine keys are always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HeatMap {
    cells: BTreeMap<String, Vec<HeatMapEntry>>,
}

impl HeatMap {
    pub fn build(assessments: &[RiskAssessment], stage: Stage) -> Self {
        let mut cells: BTreeMap<String, Vec<HeatMapEntry>> = HeatBand::ALL
            .into_iter()
            .flat_map(|p| HeatBand::ALL.into_iter().map(move |i| heat_cell_key(p, i)))
            .map(|key| (key, Vec::new()))
            .collect();

        for assessment in assessments {
            let pos = assessment.position(stage);
            let key = heat_cell_key(
                HeatBand::for_axis(pos.probability),
                HeatBand::for_axis(pos.impact),
            );
            cells.entry(key).or_default().push(HeatMapEntry {
                id: assessment.id.clone(),
                name: assessment.name.clone(),
                probability: pos.probability,
                impact: pos.impact,
                score: pos.score(),
            });
        }

        Self { cells }
    }

    pub fn cell(&self, probability: HeatBand, impact: HeatBand) -> &[HeatMapEntry] {
        self.cells
            .get(&heat_cell_key(probability, impact))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cells(&self) -> &BTreeMap<String, Vec<HeatMapEntry>> {
        &self.cells
    }
}

/// Assessments whose `stage` score is Critical, highest score first.
pub fn critical_risks<'a>(
    assessments: &'a [RiskAssessment],
    stage: Stage,
    scheme: &ThresholdScheme,
) -> Vec<&'a RiskAssessment> {
    let mut critical: Vec<&RiskAssessment> = assessments
        .iter()
        .filter(|a| scheme.classify(a.score(stage) as f64) == RiskLevel::Critical)
        .collect();
    critical.sort_by(|a, b| b.score(stage).cmp(&a.score(stage)));
    critical
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl LevelCounts {
    fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Critical => self.critical += 1,
        }
    }

    pub fn get(&self, level: RiskLevel) -> u32 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSummary {
    pub total_risks: u32,
    pub inherent_levels: LevelCounts,
    pub residual_levels: LevelCounts,
    pub total_inherent_score: u32,
    pub total_residual_score: u32,
    pub score_reduction: u32,
}

pub fn summarize(assessments: &[RiskAssessment], scheme: &ThresholdScheme) -> RegisterSummary {
    let mut inherent_levels = LevelCounts::default();
    let mut residual_levels = LevelCounts::default();
    let mut total_inherent_score = 0u32;
    let mut total_residual_score = 0u32;

    for a in assessments {
        let inherent = a.score(Stage::Inherent);
        let residual = a.score(Stage::Residual);
        inherent_levels.record(scheme.classify(inherent as f64));
        residual_levels.record(scheme.classify(residual as f64));
        total_inherent_score += inherent as u32;
        total_residual_score += residual as u32;
    }

    RegisterSummary {
        total_risks: assessments.len() as u32,
        inherent_levels,
        residual_levels,
        total_inherent_score,
        total_residual_score,
        // residual never exceeds inherent
        score_reduction: total_inherent_score - total_residual_score,
    }
}
