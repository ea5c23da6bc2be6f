//! Inverse-CDF samplers for the simulation inputs.

use crate::{
    error::{QuantError, QuantResult},
    rng::RandomSource,
};
use serde::{Deserialize, Serialize};

/// (min, most likely, max) of a triangular distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangular {
    pub min: f64,
    pub mode: f64,
    pub max: f64,
}

impl Triangular {
    /// `variable` names the input in the error ("impact", "probability").
    pub fn new(variable: &'static str, min: f64, mode: f64, max: f64) -> QuantResult<Self> {
        let finite = min.is_finite()
            && mode.is_finite()
            && max.is_finite()
            && (max - min).is_finite();
        if !finite || max < min || mode < min || mode > max {
            return Err(QuantError::InvalidDistributionParameters {
                variable,
                min,
                mode,
                max,
            });
        }
        Ok(Self { min, mode, max })
    }

    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    /// Analytical mean (min + mode + max) / 3.
    pub fn mean(&self) -> f64 {
        self.min / 3.0 + self.mode / 3.0 + self.max / 3.0
    }

    /// Map one uniform draw `u` in [0, 1) onto the distribution.
    pub fn quantile(&self, u: f64) -> f64 {
        if self.is_degenerate() {
            return self.min;
        }
        let span = self.max - self.min;
        let split = (self.mode - self.min) / span;
        let x = if u < split {
            self.min + sqrt_product(u * span, self.mode - self.min)
        } else {
            self.max - sqrt_product((1.0 - u) * span, self.max - self.mode)
        };
        // rounding in sqrt can overshoot by an ulp
        x.clamp(self.min, self.max)
    }

    pub fn sample(&self, rng: &mut dyn RandomSource) -> f64 {
        self.quantile(rng.next_f64())
    }
}

/// sqrt(a * b) for non-negative finite `a`, `b`.
///
/// Near `f64::MAX` the product overflows, so the factors are rooted
/// separately there.
fn sqrt_product(a: f64, b: f64) -> f64 {
    let product = a * b;
    if product.is_finite() {
        product.sqrt()
    } else {
        a.sqrt() * b.sqrt()
    }
}

/// Flat distribution over [min, max).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Uniform {
    pub min: f64,
    pub max: f64,
}

impl Uniform {
    pub fn new(variable: &'static str, min: f64, max: f64) -> QuantResult<Self> {
        if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() || max < min {
            return Err(QuantError::InvalidDistributionParameters {
                variable,
                min,
                mode: min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    pub fn quantile(&self, u: f64) -> f64 {
        self.min + u * (self.max - self.min)
    }

    pub fn sample(&self, rng: &mut dyn RandomSource) -> f64 {
        self.quantile(rng.next_f64())
    }
}

/// Whatever the probability input was configured as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputDistribution {
    Triangular(Triangular),
    Uniform(Uniform),
}

impl InputDistribution {
    pub fn sample(&self, rng: &mut dyn RandomSource) -> f64 {
        match self {
            Self::Triangular(t) => t.sample(rng),
            Self::Uniform(u) => u.sample(rng),
        }
    }
}
