//! Weighted least squares position and velocity estimator
use log::{debug, error, warn};
use nalgebra::Matrix4;

use crate::{
    cfg::Config,
    constants::{MIN_SATELLITES, SPEED_OF_LIGHT_M_S},
    coords::ecef_to_geodetic,
    error::Error,
    math::least_squares,
    measurement::ReconstructedEpoch,
    navmsg::NavigationMessage,
    prelude::{GpsTime, Vector3},
};

mod dop;
mod input;
mod solutions;
mod velocity;

pub use dop::DilutionOfPrecision;
pub use input::SatelliteContribution;
pub use solutions::{EpochSolution, PositionVelocitySolution};

use input::{Candidate, Input};

use dop::{q_enu, spatial_block};
use velocity::solve_velocity;

/// Estimator progress, within one epoch
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EstimatorState {
    /// Gathering the ephemeris of each measured satellite
    AwaitingEphemeris,
    /// Resolving transmission times and satellite clocks
    BuildingResiduals,
    /// Gauss-Newton refinement
    Iterating,
    Converged,
    Failed,
}

impl std::fmt::Display for EstimatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingEphemeris => write!(f, "awaiting-ephemeris"),
            Self::BuildingResiduals => write!(f, "building-residuals"),
            Self::Iterating => write!(f, "iterating"),
            Self::Converged => write!(f, "converged"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Initial receiver state
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Seed {
    pub position: Vector3<f64>,
    pub clock_bias_m: f64,
}

/// Converged Gauss-Newton state, for one set of satellites
#[derive(Debug, Clone)]
struct PositionFix {
    position: Vector3<f64>,
    clock_bias_m: f64,
    /// Final linearization, evaluated at the converged state
    input: Input,
    q: Matrix4<f64>,
    iterations: usize,
}

/// Everything the estimator produced for one epoch
#[derive(Debug, Clone)]
pub(crate) struct EstimatorOutput {
    pub solution: PositionVelocitySolution,
    /// Satellite states and residuals of the first converged pass,
    /// prior to outlier rejection
    pub first_pass: Vec<SatelliteContribution>,
    /// Receiver position of the first converged pass (ECEF, m)
    pub first_pass_position: Vector3<f64>,
    /// Receiver clock bias of the first converged pass (m)
    pub first_pass_clock_bias_m: f64,
}

/// Weighted least squares estimator. One [Estimator] resolves one epoch,
/// with the [NavigationMessage] selected for that epoch.
pub(crate) struct Estimator<'a> {
    cfg: &'a Config,
    nav: &'a NavigationMessage,
    state: EstimatorState,
}

impl<'a> Estimator<'a> {
    pub fn new(cfg: &'a Config, nav: &'a NavigationMessage) -> Self {
        Self {
            cfg,
            nav,
            state: EstimatorState::AwaitingEphemeris,
        }
    }

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    fn transition(&mut self, t: GpsTime, state: EstimatorState) {
        debug!("{} - {} -> {}", t, self.state, state);
        self.state = state;
    }

    /// Resolves the epoch received at `t`, starting from `seed`.
    pub fn solve(
        &mut self,
        t: GpsTime,
        epoch: &ReconstructedEpoch,
        seed: Seed,
    ) -> Result<EstimatorOutput, Error> {
        match self.run(t, epoch, seed) {
            Ok(output) => {
                self.transition(t, EstimatorState::Converged);
                Ok(output)
            },
            Err(e) => {
                self.transition(t, EstimatorState::Failed);
                Err(e)
            },
        }
    }

    fn run(
        &mut self,
        t: GpsTime,
        epoch: &ReconstructedEpoch,
        seed: Seed,
    ) -> Result<EstimatorOutput, Error> {
        self.state = EstimatorState::AwaitingEphemeris;
        let candidates = self.candidates(t, epoch);

        if candidates.len() < MIN_SATELLITES {
            warn!("{} - not enough satellites ({})", t, candidates.len());
            return Err(Error::InsufficientSatellites(candidates.len()));
        }

        self.transition(t, EstimatorState::Iterating);

        let mut candidates = candidates;
        let mut position = seed.position;
        let mut clock_bias_m = seed.clock_bias_m;
        let mut iterations = 0;
        let mut first_pass = None;

        let fix = loop {
            let fix = self.converge(t, &candidates, position, clock_bias_m)?;

            iterations += fix.iterations;
            position = fix.position;
            clock_bias_m = fix.clock_bias_m;

            if first_pass.is_none() {
                first_pass = Some((
                    fix.input.contributions.clone(),
                    fix.position,
                    fix.clock_bias_m,
                ));
            }

            let outliers = fix
                .input
                .contributions
                .iter()
                .filter(|c| c.residual_m.abs() > self.cfg.max_residual_m)
                .map(|c| c.id)
                .collect::<Vec<_>>();

            if outliers.is_empty() {
                break fix;
            }

            if fix.input.len() - outliers.len() < MIN_SATELLITES {
                debug!(
                    "{} - {} outliers, but too few satellites would remain",
                    t,
                    outliers.len()
                );
                break fix;
            }

            for id in outliers.iter() {
                warn!("{} ({}) - rejected: residual exceeds {}m", t, id, self.cfg.max_residual_m);
            }

            candidates.retain(|cd| !outliers.contains(&cd.id()));
        };

        let geodetic = ecef_to_geodetic(&fix.position);
        let contributions = fix.input.contributions.clone();

        let (velocity, clock_drift_m_s, q_vel) =
            match solve_velocity(&contributions, &fix.position, self.cfg.modeling.weighted) {
                Ok(vel) => (vel.velocity, vel.clock_drift_m_s, Some(vel.q)),
                Err(e) => {
                    warn!("{} - velocity: {}", t, e);
                    (Vector3::repeat(f64::NAN), f64::NAN, None)
                },
            };

        let mut solution = PositionVelocitySolution::new(
            t,
            fix.position,
            fix.clock_bias_m,
            velocity,
            clock_drift_m_s,
            geodetic,
        );

        let pos_enu = q_enu(&spatial_block(&fix.q), geodetic.lat_rad, geodetic.lon_rad);
        solution.uncertainty_enu[0] = pos_enu[(0, 0)].sqrt();
        solution.uncertainty_enu[1] = pos_enu[(1, 1)].sqrt();
        solution.uncertainty_enu[2] = pos_enu[(2, 2)].sqrt();

        if let Some(q_vel) = q_vel {
            let vel_enu = q_enu(&spatial_block(&q_vel), geodetic.lat_rad, geodetic.lon_rad);
            solution.uncertainty_enu[3] = vel_enu[(0, 0)].sqrt();
            solution.uncertainty_enu[4] = vel_enu[(1, 1)].sqrt();
            solution.uncertainty_enu[5] = vel_enu[(2, 2)].sqrt();
        }

        solution.dop = DilutionOfPrecision::new(&fix.input.g, geodetic.lat_rad, geodetic.lon_rad)
            .unwrap_or_else(|e| {
                debug!("{} - dop: {}", t, e);
                DilutionOfPrecision::nan()
            });

        solution.contributions = contributions;
        solution.iterations = iterations;

        let (first_pass, first_pass_position, first_pass_clock_bias_m) =
            first_pass.unwrap_or((Vec::new(), fix.position, fix.clock_bias_m));

        Ok(EstimatorOutput {
            solution,
            first_pass,
            first_pass_position,
            first_pass_clock_bias_m,
        })
    }

    /// Selects the satellites that may contribute: usable ephemeris,
    /// resolved transmission time and orbit.
    fn candidates(&mut self, t: GpsTime, epoch: &ReconstructedEpoch) -> Vec<Candidate<'a>> {
        let nav = self.nav;
        let cfg = self.cfg;

        let with_ephemeris = epoch
            .pseudoranges
            .iter()
            .filter_map(|pr| {
                match nav.usable_ephemeris(pr.id, t, cfg.ephemeris_max_age) {
                    Ok(eph) => Some((pr, eph)),
                    Err(e) => {
                        debug!("{} ({}) - {}", t, pr.id, e);
                        None
                    },
                }
            })
            .collect::<Vec<_>>();

        self.transition(t, EstimatorState::BuildingResiduals);

        with_ephemeris
            .into_iter()
            .filter_map(|(pr, eph)| {
                let tow_sv_s = epoch.rx_tow_s - pr.pseudorange_m / SPEED_OF_LIGHT_M_S;
                let resolved = eph
                    .clock_correction(tow_sv_s, &cfg.modeling)
                    .and_then(|clock| Ok((clock, eph.kepler_state(clock.tx_tow_s)?)));
                match resolved {
                    Ok((clock, orbit)) => Some(Candidate {
                        pseudorange: *pr,
                        ephemeris: eph,
                        clock,
                        orbit,
                    }),
                    Err(e) => {
                        debug!("{} ({}) - {}", t, pr.id, e);
                        None
                    },
                }
            })
            .collect()
    }

    /// Gauss-Newton iterations until the position correction settles.
    fn converge(
        &self,
        t: GpsTime,
        candidates: &[Candidate],
        mut position: Vector3<f64>,
        mut clock_bias_m: f64,
    ) -> Result<PositionFix, Error> {
        let modeling = &self.cfg.modeling;
        let wants_atmosphere = modeling.iono_delay || modeling.tropo_delay;
        let iono = self.nav.iono.as_ref();

        // magnitude of the last position correction
        let mut last_delta_m = f64::INFINITY;

        for iteration in 1..=self.cfg.max_iterations {
            let atmosphere = last_delta_m < self.cfg.atmospheric_threshold_m;

            let input = Input::new(self.cfg, t, iono, candidates, &position, clock_bias_m, atmosphere);

            if input.len() < MIN_SATELLITES {
                return Err(Error::InsufficientSatellites(input.len()));
            }

            let lsq = least_squares(&input.g, input.w.as_ref(), &input.b)?;

            position[0] += lsq.dx[0];
            position[1] += lsq.dx[1];
            position[2] += lsq.dx[2];
            clock_bias_m += lsq.dx[3];

            last_delta_m = lsq.dx[0].abs() + lsq.dx[1].abs() + lsq.dx[2].abs();

            debug!(
                "{} - iteration #{}: |dx|={:.6}m (x={:.3} y={:.3} z={:.3} b={:.3})",
                t, iteration, last_delta_m, position[0], position[1], position[2], clock_bias_m
            );

            let settled = atmosphere || !wants_atmosphere;

            if last_delta_m < self.cfg.convergence_m && settled {
                // residuals and covariance at the converged state
                let input = Input::new(self.cfg, t, iono, candidates, &position, clock_bias_m, true);
                let lsq = least_squares(&input.g, input.w.as_ref(), &input.b)?;

                return Ok(PositionFix {
                    position,
                    clock_bias_m,
                    q: lsq.q,
                    input,
                    iterations: iteration,
                });
            }
        }

        error!(
            "{} - no convergence after {} iterations",
            t, self.cfg.max_iterations
        );
        Err(Error::WlsConvergence(self.cfg.max_iterations))
    }
}

#[cfg(test)]
mod test {
    use super::{input::Input, Estimator};
    use crate::{
        ephemeris::Ephemeris,
        tests::{init_logger, Scenario},
    };

    #[test]
    fn unresolved_orbit_is_not_a_candidate() {
        init_logger();
        let scenario = Scenario::default();
        let ids = scenario.visible(6);
        let faulty = ids[1];

        // broadcast orbit that cannot be propagated
        let eph = Ephemeris {
            m0: f64::NAN,
            ..*scenario.message.ephemeris(faulty).unwrap()
        };
        let message = scenario.message.clone().with_ephemeris(eph).unwrap();

        let mut cfg = scenario.config();
        cfg.modeling.relativistic_clock_bias = false;

        let epoch = scenario.epoch(&ids);
        let t = scenario.rx_time();

        let mut estimator = Estimator::new(&cfg, &message);
        let candidates = estimator.candidates(t, &epoch);
        assert_eq!(candidates.len(), 5);
        assert!(candidates.iter().all(|cd| cd.id() != faulty));

        // one geometry row per candidate
        let input = Input::new(
            &cfg,
            t,
            None,
            &candidates,
            &scenario.rx.ecef(),
            scenario.clock_bias_m,
            false,
        );
        assert_eq!(input.len(), candidates.len());
        assert_eq!(input.g.nrows(), candidates.len());
        assert_eq!(input.b.len(), candidates.len());
    }
}
