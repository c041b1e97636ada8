//! Epoch orchestration
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    cfg::Config,
    coords::{GeodeticPosition, Position},
    error::Error,
    measurement::MeasurementBatch,
    navigation::{EpochSolution, Estimator, EstimatorOutput, PositionVelocitySolution, Seed},
    navmsg::{
        fetch_with_timeout, AssistanceSource, NavigationMessage, NavigationMessageFrame,
        NavigationMessageStore,
    },
    prelude::{Epoch, GpsTime, PrnArray, SatelliteId, Vector3},
    residuals::{correct_residuals, GroundTruth, SatelliteResidual},
    smoothing::PseudorangeSmoother,
};

/// Origin of the [NavigationMessage] used to resolve an epoch
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NavigationSource {
    /// Decoded by the receiver
    OnDevice,
    /// Fetched from the assistance server
    Assistance,
}

impl std::fmt::Display for NavigationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnDevice => write!(f, "on-device"),
            Self::Assistance => write!(f, "assistance"),
        }
    }
}

/// Everything produced for one measurement epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// Reception time, when it could be determined
    pub t: Option<GpsTime>,
    /// Reception time expressed in UTC
    pub utc: Option<Epoch>,
    /// GPST - UTC (s), from the broadcast parameters when available
    pub gpst_utc_offset_s: Option<f64>,
    /// Navigation message source
    pub source: Option<NavigationSource>,
    /// Outcome
    pub solution: EpochSolution,
    /// Post fit pseudorange residuals (m), NaN for satellites that did not contribute
    pub residuals: PrnArray<f64>,
    /// Residuals referenced to the ground truth (m), NaN when no ground truth is defined
    pub corrected_residuals: PrnArray<f64>,
}

impl EpochReport {
    fn new(t: Option<GpsTime>, solution: EpochSolution) -> Self {
        Self {
            t,
            utc: t.map(|t| t.to_utc_epoch()),
            gpst_utc_offset_s: None,
            source: None,
            solution,
            residuals: PrnArray::nan(),
            corrected_residuals: PrnArray::nan(),
        }
    }

    /// [PositionVelocitySolution], NaN filled when the epoch was not resolved
    pub fn position_velocity(&self) -> PositionVelocitySolution {
        self.solution.solution_or_nan(self.t.unwrap_or_default())
    }

    /// Latitude, longitude (°) and altitude (m)
    pub fn lat_lon_alt_deg_deg_m(&self) -> (f64, f64, f64) {
        self.position_velocity().lat_lon_alt_deg_deg_m()
    }

    /// East, North, Up velocity (m/s)
    pub fn velocity_enu(&self) -> Vector3<f64> {
        self.position_velocity().velocity_enu
    }

    /// Position and velocity standard deviations, in ENU frame
    pub fn uncertainty_enu(&self) -> [f64; 6] {
        self.position_velocity().uncertainty_enu
    }
}

/// [EpochProcessor] owns all the state that survives between epochs
/// and resolves epochs one at a time. It is not shared: see [crate::prelude::Worker]
/// to drive it from another thread.
pub struct EpochProcessor {
    cfg: Config,
    smoother: Box<dyn PseudorangeSmoother>,
    store: NavigationMessageStore,
    assistance: Option<Arc<dyn AssistanceSource>>,
    assisted: Option<NavigationMessage>,
    reference: Option<Position>,
    ground_truth: Option<GroundTruth>,
    last_solution: Option<PositionVelocitySolution>,
    last_time: Option<GpsTime>,
}

impl EpochProcessor {
    /// Creates a new [EpochProcessor]
    pub fn new(cfg: Config) -> Self {
        info!("smoothing: {:?}", cfg.smoothing);
        Self {
            smoother: cfg.smoothing.smoother(),
            store: NavigationMessageStore::new(),
            assistance: None,
            assisted: None,
            reference: None,
            ground_truth: None,
            last_solution: None,
            last_time: None,
            cfg,
        }
    }

    /// Defines the [AssistanceSource] consulted when the on-device
    /// navigation message is incomplete.
    pub fn with_assistance(mut self, source: Arc<dyn AssistanceSource>) -> Self {
        self.assistance = Some(source);
        self
    }

    /// Current [Config]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Updates the approximate receiver location
    pub fn set_reference_location(&mut self, reference: GeodeticPosition) {
        info!(
            "reference location: lat={:.5}° lon={:.5}° alt={:.1}m",
            reference.lat_deg(),
            reference.lon_deg(),
            reference.alt_m
        );
        self.reference = Some(Position::from_geodetic(reference));
    }

    /// Defines (or clears) the ground truth used by the residual correction
    pub fn set_ground_truth(&mut self, truth: Option<GroundTruth>) {
        self.ground_truth = truth;
    }

    /// Feeds one navigation message frame to the on-device store.
    /// Returns true when a new navigation message is available.
    pub fn handle_navigation_frame(
        &mut self,
        frame: &NavigationMessageFrame,
    ) -> Result<bool, Error> {
        self.store.handle_frame(frame)
    }

    /// Latest on-device [NavigationMessage]
    pub fn navigation_message(&self) -> Option<&NavigationMessage> {
        self.store.snapshot()
    }

    /// Latest resolved [PositionVelocitySolution]
    pub fn last_solution(&self) -> Option<&PositionVelocitySolution> {
        self.last_solution.as_ref()
    }

    /// Resolves one epoch. Whatever the outcome, an [EpochReport] is returned.
    /// Internal state is only updated when the epoch is resolved.
    pub fn process(&mut self, batch: &MeasurementBatch) -> EpochReport {
        let epoch = match batch.reconstruct(self.cfg.min_cn0_dbhz) {
            Some(epoch) => epoch,
            None => {
                debug!("no usable measurement");
                let t = self.batch_time(batch, None);
                return EpochReport::new(t, EpochSolution::Insufficient(0));
            },
        };

        let epoch = self.smoother.smooth(&batch.clock, epoch);

        let ids = epoch.pseudoranges.iter().map(|pr| pr.id).collect::<Vec<_>>();

        let seed = match self.seed() {
            Some(seed) => seed,
            None => {
                error!("cannot resolve epoch: {}", Error::MissingReferenceLocation);
                let t = self.batch_time(batch, Some(epoch.rx_tow_s));
                return EpochReport::new(t, EpochSolution::Failed(Error::MissingReferenceLocation));
            },
        };

        let t_hint = batch.reception_time(epoch.rx_tow_s, self.last_time);

        let (message, source) = match self.select_navigation(&ids, t_hint) {
            Ok(selected) => selected,
            Err(e) => {
                error!("epoch skipped: {}", e);
                return EpochReport::new(t_hint, EpochSolution::Failed(e));
            },
        };

        let t = match t_hint.or_else(|| {
            message
                .week()
                .map(|week| GpsTime::from_week_tow(week, epoch.rx_tow_s))
        }) {
            Some(t) => t,
            None => {
                error!("epoch skipped: {}", Error::UnknownWeek);
                return EpochReport::new(None, EpochSolution::Failed(Error::UnknownWeek));
            },
        };

        let mut estimator = Estimator::new(&self.cfg, &message);
        let result = estimator.solve(t, &epoch, seed);

        let mut report = match result {
            Ok(output) => {
                let report = self.report(t, output);
                // commit
                if let EpochSolution::Solved(solution) = &report.solution {
                    self.last_solution = Some(solution.clone());
                }
                self.last_time = Some(t);
                report
            },
            Err(Error::InsufficientSatellites(n)) => {
                EpochReport::new(Some(t), EpochSolution::Insufficient(n))
            },
            Err(e) => {
                error!("{} - epoch failed: {}", t, e);
                EpochReport::new(Some(t), EpochSolution::Failed(e))
            },
        };

        report.source = Some(source);
        report.gpst_utc_offset_s = Some(match &message.utc {
            Some(utc) => utc.utc_offset_s(t),
            None => t.leap_seconds(),
        });

        report
    }

    /// Reception time, when the receiver clock provides it
    fn batch_time(&self, batch: &MeasurementBatch, rx_tow_s: Option<f64>) -> Option<GpsTime> {
        match rx_tow_s {
            Some(tow) => batch.reception_time(tow, self.last_time),
            None => batch.clock.gps_time(),
        }
    }

    /// Starting point of the estimator: latest solution, or the reference location
    fn seed(&self) -> Option<Seed> {
        if let Some(solution) = self.last_solution.as_ref().filter(|s| s.is_finite()) {
            return Some(Seed {
                position: solution.position_ecef(),
                clock_bias_m: solution.clock_bias_m(),
            });
        }
        self.reference.map(|reference| Seed {
            position: reference.ecef(),
            clock_bias_m: 0.0,
        })
    }

    /// Picks the [NavigationMessage] for this epoch. The on-device message is
    /// preferred as soon as it describes every measured satellite, the assistance
    /// message is used (and refreshed when incomplete) until then.
    fn select_navigation(
        &mut self,
        ids: &[SatelliteId],
        t: Option<GpsTime>,
    ) -> Result<(NavigationMessage, NavigationSource), Error> {
        if let Some(on_device) = self.store.snapshot().filter(|m| m.covers(ids)) {
            let mut message = on_device.clone();
            if message.iono.is_none() {
                if let Some(iono) = self.assisted.as_ref().and_then(|m| m.iono) {
                    debug!("ionosphere parameters from assistance");
                    message.iono = Some(iono);
                }
            }
            return Ok((message, NavigationSource::OnDevice));
        }

        if let Some(assisted) = self.assisted.as_ref().filter(|m| m.covers(ids)) {
            return Ok((assisted.clone(), NavigationSource::Assistance));
        }

        let source = match &self.assistance {
            Some(source) => source.clone(),
            None => {
                // best effort: satellites lacking ephemeris are dropped
                let message = self.store.snapshot().cloned().unwrap_or_default();
                return Ok((message, NavigationSource::OnDevice));
            },
        };

        let reference = self
            .last_solution
            .as_ref()
            .filter(|s| s.is_finite())
            .map(|s| s.geodetic)
            .or(self.reference.map(|r| r.geodetic()))
            .ok_or(Error::MissingReferenceLocation)?;

        let message = fetch_with_timeout(source, reference, t, self.cfg.assistance_timeout)?;

        if !message.covers(ids) {
            warn!("assistance data does not describe every measured satellite");
        }

        info!("new assistance data: {} ephemerides", message.len());
        self.assisted = Some(message.clone());

        Ok((message, NavigationSource::Assistance))
    }

    fn report(&self, t: GpsTime, output: EstimatorOutput) -> EpochReport {
        let mut residuals = PrnArray::nan();
        for contrib in output.solution.contributions.iter() {
            residuals.set(contrib.id, contrib.residual_m);
        }

        let corrected_residuals = match &self.ground_truth {
            Some(truth) => {
                let first_pass = output
                    .first_pass
                    .iter()
                    .map(|c| SatelliteResidual {
                        id: c.id,
                        position: c.state.position,
                        residual_m: c.residual_m + output.first_pass_clock_bias_m,
                    })
                    .collect::<Vec<_>>();

                correct_residuals(
                    &first_pass,
                    &output.first_pass_position,
                    truth,
                    self.cfg.residual_clock_deviation_m,
                )
                .map(|corrected| corrected.residuals)
                .unwrap_or_else(PrnArray::nan)
            },
            None => PrnArray::nan(),
        };

        let (lat, lon, alt) = output.solution.lat_lon_alt_deg_deg_m();
        info!(
            "{} - lat={:.6}° lon={:.6}° alt={:.2}m ({} satellites)",
            t,
            lat,
            lon,
            alt,
            output.solution.contributions.len()
        );

        let mut report = EpochReport::new(Some(t), EpochSolution::Solved(output.solution));
        report.residuals = residuals;
        report.corrected_residuals = corrected_residuals;
        report
    }
}
