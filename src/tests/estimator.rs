use rstest::*;

use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    error::Error,
    navigation::{Estimator, EstimatorState, Seed},
    tests::{init_logger, Scenario},
};

#[test]
fn six_satellites_end_to_end() {
    init_logger();
    let scenario = Scenario::default();
    let cfg = scenario.config();
    let ids = scenario.visible(6);
    assert_eq!(ids.len(), 6);

    let epoch = scenario.epoch(&ids);
    let mut estimator = Estimator::new(&cfg, &scenario.message);
    let output = estimator
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap();

    assert_eq!(estimator.state(), EstimatorState::Converged);

    let solution = output.solution;
    let err_m = (solution.position_ecef() - scenario.rx.ecef()).norm();
    assert!(err_m < 1.0E-2, "position error {}m", err_m);

    let clock_err_s = (solution.clock_bias_m() - scenario.clock_bias_m) / SPEED_OF_LIGHT_M_S;
    assert!(clock_err_s.abs() < 1.0E-9, "clock error {}s", clock_err_s);

    assert!(solution.velocity_ecef().norm() < 1.0E-3);
    assert!((solution.state[7] - scenario.clock_drift_m_s).abs() < 1.0E-3);

    let (lat, lon, alt) = solution.lat_lon_alt_deg_deg_m();
    assert!((lat - 37.42).abs() < 1.0E-6);
    assert!((lon + 122.08).abs() < 1.0E-6);
    assert!((alt - 15.0).abs() < 1.0E-2);

    assert_eq!(solution.satellites(), ids);
    assert!(solution.uncertainty_enu.iter().all(|u| u.is_finite() && *u > 0.0));
    assert!(solution.dop.gdop.is_finite());
    assert!(solution.dop.hdop <= solution.dop.pdop);

    for contrib in solution.contributions.iter() {
        assert!(contrib.residual_m.abs() < 1.0E-3);
        assert_eq!(contrib.iono_m, 0.0);
        assert_eq!(contrib.tropo_m, 0.0);
    }
}

#[rstest]
#[case(3, false)]
#[case(4, true)]
fn minimal_number_of_satellites(#[case] count: usize, #[case] finite: bool) {
    init_logger();
    let scenario = Scenario::default();
    let cfg = scenario.config();
    let ids = scenario.visible(count);
    assert_eq!(ids.len(), count);

    let epoch = scenario.epoch(&ids);
    let mut estimator = Estimator::new(&cfg, &scenario.message);

    match estimator.solve(scenario.rx_time(), &epoch, scenario.seed()) {
        Ok(output) => {
            assert!(finite, "unexpected solution");
            assert!(output.solution.is_finite());
            let err_m = (output.solution.position_ecef() - scenario.rx.ecef()).norm();
            assert!(err_m < 1.0E-2, "position error {}m", err_m);
        },
        Err(e) => {
            assert!(!finite, "unexpected failure: {}", e);
            assert_eq!(e, Error::InsufficientSatellites(count));
            assert_eq!(estimator.state(), EstimatorState::Failed);
        },
    }
}

#[test]
fn outlier_rejection() {
    init_logger();
    let scenario = Scenario::default();
    let cfg = scenario.config();
    let ids = scenario.visible(8);
    assert_eq!(ids.len(), 8);

    let mut epoch = scenario.epoch(&ids);
    let faulty = epoch.pseudoranges[3].id;
    epoch.pseudoranges[3].pseudorange_m += 100.0;

    let output = Estimator::new(&cfg, &scenario.message)
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap();

    let solution = output.solution;
    assert!(!solution.satellites().contains(&faulty));
    assert!(solution.satellites().len() >= 4);

    let err_m = (solution.position_ecef() - scenario.rx.ecef()).norm();
    assert!(err_m < 1.0E-2, "position error {}m", err_m);

    // first pass still describes every satellite
    assert_eq!(output.first_pass.len(), 8);
    assert!(output
        .first_pass
        .iter()
        .any(|c| c.id == faulty && c.residual_m.abs() > cfg.max_residual_m));
}

#[test]
fn outlier_rejection_idempotence() {
    init_logger();
    let scenario = Scenario::default();
    let cfg = scenario.config();
    let ids = scenario.visible(8);
    let epoch = scenario.epoch(&ids);

    let first = Estimator::new(&cfg, &scenario.message)
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap()
        .solution;

    assert_eq!(first.satellites(), ids);

    // run again from the previous solution, on the retained satellites
    let mut clean = epoch.clone();
    clean
        .pseudoranges
        .retain(|pr| first.satellites().contains(&pr.id));

    let seed = Seed {
        position: first.position_ecef(),
        clock_bias_m: first.clock_bias_m(),
    };

    let second = Estimator::new(&cfg, &scenario.message)
        .solve(scenario.rx_time(), &clean, seed)
        .unwrap()
        .solution;

    assert_eq!(second.satellites(), first.satellites());
    assert!((second.position_ecef() - first.position_ecef()).norm() < 1.0E-4);
    assert!((second.clock_bias_m() - first.clock_bias_m()).abs() < 1.0E-4);
}

#[test]
fn singular_covariance_fallback() {
    init_logger();
    let scenario = Scenario::default();
    let cfg = scenario.config();
    let ids = scenario.visible(6);

    let mut epoch = scenario.epoch(&ids);
    for pr in epoch.pseudoranges.iter_mut() {
        pr.uncertainty_m = 0.0;
    }

    let solution = Estimator::new(&cfg, &scenario.message)
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap()
        .solution;

    let err_m = (solution.position_ecef() - scenario.rx.ecef()).norm();
    assert!(err_m < 1.0E-2, "position error {}m", err_m);
}

#[test]
fn atmospheric_corrections() {
    init_logger();
    let scenario = Scenario::default().with_atmosphere();
    let cfg = scenario.config();
    let ids = scenario.visible(7);
    let epoch = scenario.epoch(&ids);

    let solution = Estimator::new(&cfg, &scenario.message)
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap()
        .solution;

    let err_m = (solution.position_ecef() - scenario.rx.ecef()).norm();
    assert!(err_m < 1.0E-2, "position error {}m", err_m);

    for contrib in solution.contributions.iter() {
        // slant delays: a few meters
        assert!(contrib.iono_m > 0.5 && contrib.iono_m < 100.0, "iono {}", contrib.iono_m);
        assert!(contrib.tropo_m > 2.0 && contrib.tropo_m < 30.0, "tropo {}", contrib.tropo_m);
    }

    // ignoring the atmosphere biases the solution
    let modeling = cfg.modeling.without_atmosphere();
    let cfg = cfg.with_modeling(modeling);
    let biased = Estimator::new(&cfg, &scenario.message)
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap()
        .solution;

    assert!((biased.position_ecef() - scenario.rx.ecef()).norm() > 1.0);
}

#[test]
fn unknown_satellites_are_dropped() {
    init_logger();
    let scenario = Scenario::default();
    let cfg = scenario.config();
    let ids = scenario.visible(6);
    let epoch = scenario.epoch(&ids);

    // navigation message lacking two of the measured satellites
    let mut message = scenario.message.clone();
    message.ephemerides.set(ids[0], None);
    message.ephemerides.set(ids[1], None);

    let solution = Estimator::new(&cfg, &message)
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap()
        .solution;

    assert_eq!(solution.satellites().len(), 4);
    assert!(!solution.satellites().contains(&ids[0]));

    let err_m = (solution.position_ecef() - scenario.rx.ecef()).norm();
    assert!(err_m < 1.0E-2, "position error {}m", err_m);
}

#[test]
fn iteration_cap() {
    init_logger();
    let scenario = Scenario::default();
    let mut cfg = scenario.config();
    cfg.max_iterations = 1;

    let ids = scenario.visible(6);
    let epoch = scenario.epoch(&ids);

    let mut estimator = Estimator::new(&cfg, &scenario.message);
    let err = estimator
        .solve(scenario.rx_time(), &epoch, scenario.seed())
        .unwrap_err();

    assert_eq!(err, Error::WlsConvergence(1));
    assert_eq!(estimator.state(), EstimatorState::Failed);
}
