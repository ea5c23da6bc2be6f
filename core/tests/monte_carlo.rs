//! Monte Carlo simulator: validation, statistics, histogram, convergence, cancellation.

use riskquant_core::{
    config::{QuantConfig, STANDARD_SCHEME},
    error::QuantError,
    risk_matrix::{RiskLevel, RiskMatrix},
    rng::{RngBank, SequenceSource, SimulationRng},
    simulation::{
        worker::{spawn_simulation, CancellationToken},
        MonteCarloSimulator, ProbabilityShape, SimulationMode, SimulationRequest,
    },
};

fn simulator() -> MonteCarloSimulator {
    let config = QuantConfig::standard();
    MonteCarloSimulator::new(config.simulation.clone())
        .with_matrix(RiskMatrix::from_config(&config.risk_matrix).unwrap())
}

fn grid_request(iterations: i64) -> SimulationRequest {
    SimulationRequest::triangular((1.0, 3.0, 5.0), (1.0, 2.0, 5.0), iterations)
}

/// Analytical mean of impact (1,5,10) with a fixed probability of 1 is 16/3.
#[test]
fn converges_to_triangular_mean() {
    let _ = env_logger::builder().is_test(true).try_init();
    let request = SimulationRequest::triangular((1.0, 5.0, 10.0), (1.0, 1.0, 1.0), 50_000);
    let mut rng = SimulationRng::seeded(20_240_601);
    let result = simulator().run(&request, &mut rng).unwrap();

    let expected = (1.0 + 5.0 + 10.0) / 3.0;
    let error = (result.statistics.mean - expected).abs() / expected;
    assert!(
        error < 0.05,
        "mean {} is {:.2}% off {expected}",
        result.statistics.mean,
        error * 100.0
    );
    assert!(result.statistics.min >= 1.0);
    assert!(result.statistics.max <= 10.0);
}

/// Financial-impact run: outcomes never leave the impact range.
#[test]
fn magnitude_only_stays_in_impact_range() {
    let request = SimulationRequest::triangular(
        (10_000.0, 50_000.0, 200_000.0),
        (0.1, 0.3, 0.5),
        10_000,
    )
    .with_mode(SimulationMode::MagnitudeOnly);
    let mut rng = SimulationRng::seeded(7);
    let result = simulator().run(&request, &mut rng).unwrap();

    assert_eq!(result.iterations, 10_000);
    assert_eq!(result.mode, SimulationMode::MagnitudeOnly);
    assert!(result.statistics.min >= 10_000.0, "min {}", result.statistics.min);
    assert!(result.statistics.max <= 200_000.0, "max {}", result.statistics.max);
    assert!(result.percentiles.p50 >= 10_000.0 && result.percentiles.p50 <= 200_000.0);
}

/// Combined mode multiplies; magnitude-only ignores probability.
#[test]
fn modes_differ_on_same_stream() {
    let base = SimulationRequest::triangular((10.0, 20.0, 30.0), (0.5, 0.5, 0.5), 1_000);
    let combined = simulator()
        .run(&base, &mut SimulationRng::seeded(3))
        .unwrap();
    let magnitude = simulator()
        .run(&base.clone().with_mode(SimulationMode::MagnitudeOnly), &mut SimulationRng::seeded(3))
        .unwrap();

    assert!((combined.statistics.mean * 2.0 - magnitude.statistics.mean).abs() < 1e-9);
}

#[test]
fn percentiles_are_ordered() {
    for seed in [1u64, 2, 3, 99, 12345] {
        let result = simulator()
            .run(&grid_request(5_000), &mut SimulationRng::seeded(seed))
            .unwrap();
        let p = result.percentiles;
        assert!(p.p10 <= p.p50, "seed {seed}: {p:?}");
        assert!(p.p50 <= p.p90, "seed {seed}: {p:?}");
        assert!(p.p90 <= p.p95, "seed {seed}: {p:?}");
        assert!(p.p95 <= p.p99, "seed {seed}: {p:?}");
        assert!(result.statistics.min <= p.p10 && p.p99 <= result.statistics.max);
    }
}

#[test]
fn histogram_accounts_for_every_sample() {
    let iterations = 12_345;
    let result = simulator()
        .run(&grid_request(iterations), &mut SimulationRng::seeded(11))
        .unwrap();

    assert_eq!(result.histogram.len(), 20);
    let count: u32 = result.histogram.iter().map(|b| b.count).sum();
    assert_eq!(count as i64, iterations);

    let pct: f64 = result.histogram.iter().map(|b| b.percentage).sum();
    assert!((pct - 100.0).abs() < 1e-6, "percentages sum to {pct}");

    assert_eq!(result.histogram[0].range_start, result.statistics.min);
    assert_eq!(result.histogram[19].range_end, result.statistics.max);
    for pair in result.histogram.windows(2) {
        assert!((pair[0].range_end - pair[1].range_start).abs() < 1e-9);
    }
}

/// Every draw u = 0.5 on (0,5,10) gives exactly 5, so all statistics are 5.
#[test]
fn fixed_sequence_gives_exact_result() {
    let request = SimulationRequest::triangular((0.0, 5.0, 10.0), (1.0, 1.0, 1.0), 1_000);
    let mut seq = SequenceSource::new(vec![0.5]);
    let result = simulator().run(&request, &mut seq).unwrap();

    assert_eq!(result.statistics.mean, 5.0);
    assert_eq!(result.statistics.median, 5.0);
    assert_eq!(result.statistics.std_dev, 0.0);
    assert_eq!(result.percentiles.p99, 5.0);
    assert_eq!(result.histogram[19].count, 1_000);
}

#[test]
fn uniform_probability_shape() {
    let request = SimulationRequest::triangular((100.0, 100.0, 100.0), (0.1, 0.9, 0.5), 2_000)
        .with_probability_shape(ProbabilityShape::Uniform);
    // mode 0.9 > max 0.5 would be invalid for a triangle, but uniform ignores the mode
    let result = simulator()
        .run(&request, &mut SimulationRng::seeded(5))
        .unwrap();
    assert!(result.statistics.min >= 10.0);
    assert!(result.statistics.max < 50.0);
    assert!((result.statistics.mean - 30.0).abs() < 1.5, "mean {}", result.statistics.mean);
}

#[test]
fn classifies_when_scheme_named() {
    let request = SimulationRequest::triangular((4.0, 5.0, 5.0), (4.0, 5.0, 5.0), 1_000)
        .with_level_scheme(STANDARD_SCHEME);
    let result = simulator()
        .run(&request, &mut SimulationRng::seeded(8))
        .unwrap();
    let levels = result.levels.expect("levels requested");
    assert_eq!(levels.scheme, STANDARD_SCHEME);
    // every outcome is at least 16
    assert_eq!(levels.p50, RiskLevel::Critical);
    assert_eq!(levels.mean, RiskLevel::Critical);

    let unnamed = simulator()
        .run(&grid_request(1_000), &mut SimulationRng::seeded(8))
        .unwrap();
    assert!(unnamed.levels.is_none());
}

#[test]
fn unknown_level_scheme_rejected() {
    let request = grid_request(1_000).with_level_scheme("nope");
    let err = simulator()
        .run(&request, &mut SimulationRng::seeded(1))
        .unwrap_err();
    assert!(matches!(err, QuantError::UnknownScheme { .. }), "{err:?}");

    // without a matrix no scheme can be honoured
    let bare = MonteCarloSimulator::new(QuantConfig::standard().simulation);
    let err = bare
        .run(&grid_request(1_000).with_level_scheme(STANDARD_SCHEME), &mut SimulationRng::seeded(1))
        .unwrap_err();
    assert!(matches!(err, QuantError::UnknownScheme { .. }), "{err:?}");
}

#[test]
fn iteration_bounds_enforced() {
    let sim = simulator();
    for bad in [-5i64, 0, 999, 50_001, 1_000_000] {
        let err = sim
            .run(&grid_request(bad), &mut SimulationRng::seeded(1))
            .unwrap_err();
        match err {
            QuantError::InvalidIterationCount { requested, min, max } => {
                assert_eq!(requested, bad);
                assert_eq!((min, max), (1_000, 50_000));
            }
            other => panic!("expected InvalidIterationCount for {bad}, got {other:?}"),
        }
    }
    assert!(sim.validate(&grid_request(1_000)).is_ok());
    assert!(sim.validate(&grid_request(50_000)).is_ok());
}

/// A hand-built config cannot lift the iteration ceiling either.
#[test]
fn iteration_ceiling_holds_for_unvalidated_config() {
    let mut limits = QuantConfig::standard().simulation;
    limits.max_iterations = 5_000_000;
    let sim = MonteCarloSimulator::new(limits);

    match sim.validate(&grid_request(1_000_000)) {
        Err(QuantError::InvalidIterationCount { max, .. }) => assert_eq!(max, 50_000),
        other => panic!("expected InvalidIterationCount, got {other:?}"),
    }
    assert!(sim.validate(&grid_request(50_000)).is_ok());
}

#[test]
fn distribution_parameters_validated() {
    let sim = simulator();
    let cases = [
        SimulationRequest::triangular((10.0, 5.0, 1.0), (1.0, 2.0, 3.0), 1_000),
        SimulationRequest::triangular((1.0, 0.5, 10.0), (1.0, 2.0, 3.0), 1_000),
        SimulationRequest::triangular((1.0, 11.0, 10.0), (1.0, 2.0, 3.0), 1_000),
        SimulationRequest::triangular((1.0, 5.0, 10.0), (3.0, 2.0, 1.0), 1_000),
        SimulationRequest::triangular((1.0, 5.0, f64::INFINITY), (1.0, 2.0, 3.0), 1_000),
    ];
    for request in cases {
        let err = sim.validate(&request).unwrap_err();
        assert!(
            matches!(err, QuantError::InvalidDistributionParameters { .. }),
            "{request:?} gave {err:?}"
        );
    }

    match sim.validate(&cases_probability_inverted()) {
        Err(QuantError::InvalidDistributionParameters { variable, .. }) => {
            assert_eq!(variable, "probability")
        }
        other => panic!("expected probability error, got {other:?}"),
    }
}

fn cases_probability_inverted() -> SimulationRequest {
    SimulationRequest::triangular((1.0, 5.0, 10.0), (0.9, 0.5, 0.1), 1_000)
}

/// Degenerate impact and probability are legal and yield a constant.
#[test]
fn fully_degenerate_request() {
    let request = SimulationRequest::triangular((3.0, 3.0, 3.0), (2.0, 2.0, 2.0), 1_000);
    let result = simulator()
        .run(&request, &mut SimulationRng::seeded(4))
        .unwrap();
    assert_eq!(result.statistics.min, 6.0);
    assert_eq!(result.statistics.max, 6.0);
    assert_eq!(result.statistics.std_dev, 0.0);
    let count: u32 = result.histogram.iter().map(|b| b.count).sum();
    assert_eq!(count, 1_000);
}

#[test]
fn pre_cancelled_run_stops_immediately() {
    let token = CancellationToken::new();
    token.cancel();
    let err = simulator()
        .run_cancellable(&grid_request(50_000), &mut SimulationRng::seeded(1), &token)
        .unwrap_err();
    assert!(matches!(err, QuantError::Cancelled { completed: 0 }), "{err:?}");
}

#[test]
fn worker_thread_matches_inline_run() {
    let bank = RngBank::new(2024);
    let request = grid_request(20_000);

    let inline = simulator().run(&request, &mut bank.for_run(3)).unwrap();
    let handle = spawn_simulation(simulator(), request, bank.for_run(3)).unwrap();
    let threaded = handle.join().unwrap();

    assert_eq!(inline, threaded);
}

#[test]
fn worker_rejects_bad_request_before_spawning() {
    let result = spawn_simulation(simulator(), grid_request(10), SimulationRng::seeded(1));
    assert!(matches!(result, Err(QuantError::InvalidIterationCount { .. })));
}

#[test]
fn worker_cancellation_reports_cancelled_or_finishes() {
    let handle = spawn_simulation(simulator(), grid_request(50_000), SimulationRng::seeded(9)).unwrap();
    handle.cancel();
    match handle.join() {
        // raced to completion before the flag was seen
        Ok(result) => assert_eq!(result.iterations, 50_000),
        Err(QuantError::Cancelled { completed }) => {
            assert!(completed < 50_000);
            assert_eq!(completed % 1_000, 0, "checks happen on batch boundaries");
        }
        Err(other) => panic!("unexpected error {other:?}"),
    }
}

/// Cancelling through a cloned token reaches the worker; the handle
/// reports finished once the thread is done.
#[test]
fn cloned_token_cancels_worker() {
    let handle = spawn_simulation(simulator(), grid_request(50_000), SimulationRng::seeded(11)).unwrap();
    let token = handle.token();
    token.cancel();
    assert!(token.is_cancelled());

    for _ in 0..1_000 {
        if handle.is_finished() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert!(handle.is_finished(), "worker still running after cancel");

    match handle.join() {
        Ok(result) => assert_eq!(result.iterations, 50_000),
        Err(QuantError::Cancelled { completed }) => assert!(completed < 50_000),
        Err(other) => panic!("unexpected error {other:?}"),
    }
}

/// Impact ranges near f64::MAX keep their spread instead of piling up on
/// the endpoints.
#[test]
fn huge_magnitude_range_stays_finite() {
    let request = SimulationRequest::triangular((0.0, 1e307, 1.7e308), (1.0, 1.0, 1.0), 5_000)
        .with_mode(SimulationMode::MagnitudeOnly);
    let result = simulator()
        .run(&request, &mut SimulationRng::seeded(8))
        .unwrap();

    let stats = result.statistics;
    assert!(stats.mean.is_finite() && stats.std_dev.is_finite(), "{stats:?}");
    assert!(stats.median > stats.min && stats.median < stats.max, "{stats:?}");
    assert!(result.histogram.iter().all(|b| b.range_start.is_finite()));

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["statistics"]["mean"].is_f64());
}

#[test]
fn overflowing_outcome_rejected() {
    let request = SimulationRequest::triangular((1e200, 1e200, 1e200), (1e200, 1e200, 1e200), 1_000);
    match simulator().validate(&request) {
        Err(QuantError::InvalidDistributionParameters { variable, .. }) => {
            assert_eq!(variable, "outcome")
        }
        other => panic!("expected outcome error, got {other:?}"),
    }

    // the same impact alone is a legal magnitude
    assert!(simulator()
        .validate(&request.with_mode(SimulationMode::MagnitudeOnly))
        .is_ok());
}

#[test]
fn result_serializes_with_wire_names() {
    let result = simulator()
        .run(&grid_request(1_000), &mut SimulationRng::seeded(1))
        .unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["statistics"]["stdDev"].is_number());
    assert!(json["percentiles"]["p95"].is_number());
    assert!(json["histogram"][0]["rangeStart"].is_number());
    assert!(json["histogram"][0]["rangeEnd"].is_number());
    assert_eq!(json["mode"], "COMBINED");
    assert!(json.get("levels").is_none());
}

#[test]
fn request_parses_from_wire() {
    let request: SimulationRequest = serde_json::from_str(
        r#"{
            "impactMin": 10000, "impactMode": 50000, "impactMax": 200000,
            "probabilityMin": 0.1, "probabilityMode": 0.3, "probabilityMax": 0.5,
            "iterations": 10000, "mode": "MAGNITUDE_ONLY"
        }"#,
    )
    .unwrap();
    assert_eq!(request.mode, SimulationMode::MagnitudeOnly);
    assert_eq!(request.probability_shape, ProbabilityShape::Triangular);
    assert!(request.level_scheme.is_none());
}
