//! Configuration loading and validation.

use riskquant_core::{
    config::{QuantConfig, EXECUTIVE_SCHEME, HARD_MAX_ITERATIONS, STANDARD_SCHEME},
    error::QuantError,
    residual::ResidualPolicy,
    risk_matrix::ThresholdScheme,
};
use std::path::PathBuf;

fn shipped_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data/risk_quant.json")
}

/// The shipped JSON file and the built-in defaults must not drift apart.
#[test]
fn shipped_file_matches_builtin_defaults() {
    let loaded = QuantConfig::load(shipped_config_path()).expect("load shipped config");
    assert_eq!(loaded, QuantConfig::standard());
}

#[test]
fn builtin_defaults_are_valid() {
    let config = QuantConfig::standard();
    config.validate().unwrap();
    assert_eq!(config.simulation.histogram_bins, 20);
    assert_eq!(config.simulation.min_iterations, 1_000);
    assert_eq!(config.simulation.max_iterations, 50_000);
    assert_eq!(config.simulation.cancel_check_interval, 1_000);
    assert_eq!(config.residual_policy, ResidualPolicy::GreedyDiagonal);
    assert_eq!(config.risk_matrix.schemes[STANDARD_SCHEME], ThresholdScheme::STANDARD);
    assert_eq!(config.risk_matrix.schemes[EXECUTIVE_SCHEME], ThresholdScheme::EXECUTIVE);
}

#[test]
fn residual_policy_defaults_when_absent() {
    let config = QuantConfig::from_json(
        r#"{
            "risk_matrix": { "schemes": { "standard": { "medium": 5, "high": 9, "critical": 15 } } },
            "simulation": {
                "min_iterations": 1000, "max_iterations": 50000, "default_iterations": 5000,
                "histogram_bins": 10, "cancel_check_interval": 500
            }
        }"#,
    )
    .unwrap();
    assert_eq!(config.residual_policy, ResidualPolicy::GreedyDiagonal);
    assert_eq!(config.simulation.histogram_bins, 10);
}

#[test]
fn probability_first_policy_parses() {
    let mut config = QuantConfig::standard();
    config.residual_policy = ResidualPolicy::ProbabilityFirst;
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"probability_first\""));
    assert_eq!(QuantConfig::from_json(&json).unwrap(), config);
}

#[test]
fn invalid_configs_rejected() {
    let mut inverted = QuantConfig::standard();
    inverted.simulation.min_iterations = 60_000;
    assert!(matches!(inverted.validate(), Err(QuantError::InvalidConfig(_))));

    let mut no_bins = QuantConfig::standard();
    no_bins.simulation.histogram_bins = 0;
    assert!(matches!(no_bins.validate(), Err(QuantError::InvalidConfig(_))));

    let mut lifted_ceiling = QuantConfig::standard();
    lifted_ceiling.simulation.max_iterations = 5_000_000;
    assert!(matches!(lifted_ceiling.validate(), Err(QuantError::InvalidConfig(_))));

    let mut at_ceiling = QuantConfig::standard();
    at_ceiling.simulation.max_iterations = HARD_MAX_ITERATIONS;
    at_ceiling.validate().unwrap();

    let mut default_out_of_range = QuantConfig::standard();
    default_out_of_range.simulation.default_iterations = 10;
    assert!(default_out_of_range.validate().is_err());

    let mut bad_scheme = QuantConfig::standard();
    bad_scheme
        .risk_matrix
        .schemes
        .insert("broken".into(), ThresholdScheme { medium: 10, high: 10, critical: 20 });
    assert!(bad_scheme.validate().is_err());

    let mut no_schemes = QuantConfig::standard();
    no_schemes.risk_matrix.schemes.clear();
    assert!(no_schemes.validate().is_err());
}

#[test]
fn malformed_json_is_serialization_error() {
    assert!(matches!(
        QuantConfig::from_json("{ not json"),
        Err(QuantError::Serialization(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    assert!(matches!(
        QuantConfig::load("/definitely/not/here.json"),
        Err(QuantError::Io(_))
    ));
}
