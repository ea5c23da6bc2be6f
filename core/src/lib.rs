//! riskquant-core: risk quantification for the continuity platform.
//!
//! Two independent engines:
//!   - control scoring → residual risk on the 5×5 probability×impact matrix
//!   - Monte Carlo simulation over triangular input ranges
//!
//! Nothing here performs I/O beyond loading configuration, and nothing
//! holds state between calls.

pub mod config;
pub mod control;
pub mod control_scoring;
pub mod error;
pub mod register;
pub mod residual;
pub mod risk_matrix;
pub mod rng;
pub mod simulation;
pub mod types;
