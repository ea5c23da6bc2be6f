//! Monte Carlo simulator.
//!
//! Each run:
//!   1. Validates the request (distribution triples, iteration bounds,
//!      level scheme if one was named)
//!   2. Draws `iterations` (impact, probability) pairs from the caller's
//!      RandomSource, checking for cancellation every fixed batch
//!   3. Sorts the outcomes and derives statistics, percentiles and a
//!      fixed-width histogram
//!
//! A run owns nothing but its sample buffer. Cancelling one leaves no
//! state behind.

pub mod sampling;
pub mod statistics;
pub mod worker;

use crate::{
    config::{SimulationConfig, HARD_MAX_ITERATIONS},
    error::{QuantError, QuantResult},
    rng::RandomSource,
    risk_matrix::{RiskLevel, RiskMatrix},
};
use sampling::{InputDistribution, Triangular, Uniform};
use serde::{Deserialize, Serialize};
use statistics::{HistogramBin, Percentiles, Statistics};
use worker::CancellationToken;

/// How each iteration's outcome is formed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationMode {
    /// outcome = impact × probability
    #[default]
    Combined,
    /// outcome = impact; probability is still drawn but not applied
    MagnitudeOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbabilityShape {
    #[default]
    Triangular,
    /// Flat over [probabilityMin, probabilityMax]; the mode is ignored.
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRequest {
    pub impact_min: f64,
    pub impact_mode: f64,
    pub impact_max: f64,
    pub probability_min: f64,
    pub probability_mode: f64,
    pub probability_max: f64,
    pub iterations: i64,
    #[serde(default)]
    pub mode: SimulationMode,
    #[serde(default)]
    pub probability_shape: ProbabilityShape,
    /// Classify the headline outcomes under this threshold scheme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_scheme: Option<String>,
}

impl SimulationRequest {
    /// Combined-mode request with triangular inputs.
    pub fn triangular(impact: (f64, f64, f64), probability: (f64, f64, f64), iterations: i64) -> Self {
        Self {
            impact_min: impact.0,
            impact_mode: impact.1,
            impact_max: impact.2,
            probability_min: probability.0,
            probability_mode: probability.1,
            probability_max: probability.2,
            iterations,
            mode: SimulationMode::Combined,
            probability_shape: ProbabilityShape::Triangular,
            level_scheme: None,
        }
    }

    pub fn with_mode(mut self, mode: SimulationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_probability_shape(mut self, shape: ProbabilityShape) -> Self {
        self.probability_shape = shape;
        self
    }

    pub fn with_level_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.level_scheme = Some(scheme.into());
        self
    }
}

/// Headline outcomes classified on the risk matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLevels {
    pub scheme: String,
    pub mean: RiskLevel,
    pub p50: RiskLevel,
    pub p90: RiskLevel,
    pub p99: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub iterations: u32,
    pub mode: SimulationMode,
    pub statistics: Statistics,
    pub percentiles: Percentiles,
    pub histogram: Vec<HistogramBin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<ResultLevels>,
}

/// A request that passed validation, with its distributions built.
#[derive(Debug, Clone)]
struct PreparedRun {
    impact: Triangular,
    probability: InputDistribution,
    iterations: u32,
    mode: SimulationMode,
    level_scheme: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    config: SimulationConfig,
    matrix: Option<RiskMatrix>,
}

impl MonteCarloSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            matrix: None,
        }
    }

    /// Enables `levelScheme` on requests.
    pub fn with_matrix(mut self, matrix: RiskMatrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Reject anything the sampler cannot handle, before any draw.
    pub fn validate(&self, request: &SimulationRequest) -> QuantResult<()> {
        self.prepare(request).map(|_| ())
    }

    pub fn run(
        &self,
        request: &SimulationRequest,
        rng: &mut dyn RandomSource,
    ) -> QuantResult<SimulationResult> {
        self.run_cancellable(request, rng, &CancellationToken::new())
    }

    /// Like `run`, but polls `cancel` every `cancel_check_interval` draws.
    pub fn run_cancellable(
        &self,
        request: &SimulationRequest,
        rng: &mut dyn RandomSource,
        cancel: &CancellationToken,
    ) -> QuantResult<SimulationResult> {
        let run = self.prepare(request).inspect_err(|e| {
            log::warn!("simulation: rejected request: {e}");
        })?;

        let outcomes = self.draw(&run, rng, cancel)?;
        let result = self.summarize(&run, outcomes)?;

        log::info!(
            "simulation: {} iterations mode={:?} mean={:.4} p90={:.4}",
            result.iterations,
            result.mode,
            result.statistics.mean,
            result.percentiles.p90
        );
        Ok(result)
    }

    fn prepare(&self, request: &SimulationRequest) -> QuantResult<PreparedRun> {
        let min = self.config.min_iterations;
        let max = self.config.max_iterations.min(HARD_MAX_ITERATIONS);
        if request.iterations < min as i64 || request.iterations > max as i64 {
            return Err(QuantError::InvalidIterationCount {
                requested: request.iterations,
                min,
                max,
            });
        }

        let impact = Triangular::new(
            "impact",
            request.impact_min,
            request.impact_mode,
            request.impact_max,
        )?;
        let probability = match request.probability_shape {
            ProbabilityShape::Triangular => InputDistribution::Triangular(Triangular::new(
                "probability",
                request.probability_min,
                request.probability_mode,
                request.probability_max,
            )?),
            ProbabilityShape::Uniform => InputDistribution::Uniform(Uniform::new(
                "probability",
                request.probability_min,
                request.probability_max,
            )?),
        };

        let (low, high) = outcome_bounds(request);
        if !low.is_finite() || !high.is_finite() || !(high - low).is_finite() {
            return Err(QuantError::InvalidDistributionParameters {
                variable: "outcome",
                min: low,
                mode: request.impact_mode * request.probability_mode,
                max: high,
            });
        }

        if let Some(scheme) = &request.level_scheme {
            self.matrix
                .as_ref()
                .ok_or_else(|| QuantError::UnknownScheme {
                    name: scheme.clone(),
                })?
                .scheme(scheme)?;
        }

        Ok(PreparedRun {
            impact,
            probability,
            iterations: request.iterations as u32,
            mode: request.mode,
            level_scheme: request.level_scheme.clone(),
        })
    }

    fn draw(
        &self,
        run: &PreparedRun,
        rng: &mut dyn RandomSource,
        cancel: &CancellationToken,
    ) -> QuantResult<Vec<f64>> {
        let check_every = self.config.cancel_check_interval.max(1);
        let mut outcomes = Vec::with_capacity(run.iterations as usize);

        for i in 0..run.iterations {
            if i % check_every == 0 && cancel.is_cancelled() {
                log::warn!("simulation: cancelled after {i} of {} iterations", run.iterations);
                return Err(QuantError::Cancelled { completed: i });
            }
            let impact = run.impact.sample(rng);
            let probability = run.probability.sample(rng);
            let outcome = match run.mode {
                SimulationMode::Combined => impact * probability,
                SimulationMode::MagnitudeOnly => impact,
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn summarize(&self, run: &PreparedRun, mut outcomes: Vec<f64>) -> QuantResult<SimulationResult> {
        // inputs are finite, so total_cmp is a plain numeric order here
        outcomes.sort_by(f64::total_cmp);

        let stats = statistics::describe(&outcomes);
        let pct = statistics::percentiles(&outcomes);
        let histogram = statistics::histogram(&outcomes, self.config.histogram_bins);

        let levels = match (&run.level_scheme, &self.matrix) {
            (Some(name), Some(matrix)) => {
                let scheme = matrix.scheme(name)?;
                Some(ResultLevels {
                    scheme: name.clone(),
                    mean: scheme.classify(stats.mean),
                    p50: scheme.classify(pct.p50),
                    p90: scheme.classify(pct.p90),
                    p99: scheme.classify(pct.p99),
                })
            }
            _ => None,
        };

        Ok(SimulationResult {
            iterations: run.iterations,
            mode: run.mode,
            statistics: stats,
            percentiles: pct,
            histogram,
            levels,
        })
    }
}

/// Smallest and largest outcome a request can produce.
fn outcome_bounds(request: &SimulationRequest) -> (f64, f64) {
    match request.mode {
        SimulationMode::MagnitudeOnly => (request.impact_min, request.impact_max),
        SimulationMode::Combined => {
            let corners = [
                request.impact_min * request.probability_min,
                request.impact_min * request.probability_max,
                request.impact_max * request.probability_min,
                request.impact_max * request.probability_max,
            ];
            corners
                .into_iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c), hi.max(c)))
        }
    }
}
