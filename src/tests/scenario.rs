//! Synthetic observation scenarios
use itertools::Itertools;

use crate::{
    bias::{Bias, BiasRuntime, KbModel, TroposphereModel},
    cfg::{Config, Modeling},
    constants::{AVERAGE_TRAVEL_TIME_S, L1_FREQUENCY_HZ, SECONDS_PER_WEEK, SPEED_OF_LIGHT_M_S},
    coords::{topocentric, Position},
    measurement::{
        pseudorange_uncertainty_m, ClockMeasurement, Measurement, MeasurementBatch,
        PseudorangeWithUncertainty, ReconstructedEpoch, ADR_STATE_VALID,
    },
    navigation::Seed,
    navmsg::NavigationMessage,
    prelude::{GpsTime, SatelliteId, Vector3},
    tests::{reference_ephemeris, REFERENCE_TOE_S, REFERENCE_WEEK},
};

/// C/N0 of every synthetic signal
pub const SCENARIO_CN0_DBHZ: f64 = 45.0;

/// Pseudorange rate standard deviation of every synthetic signal
pub const SCENARIO_RATE_SIGMA_MPS: f64 = 0.05;

/// Typical ionosphere parameters
pub const IONO_ALPHA: [f64; 4] = [1.1176E-8, 7.4506E-9, -5.9605E-8, -5.9605E-8];
pub const IONO_BETA: [f64; 4] = [90112.0, 0.0, -196608.0, -65536.0];

/// Exact observation of one satellite
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub id: SatelliteId,
    /// Satellite time of transmission (s of week)
    pub tow_sv_s: f64,
    pub pseudorange_m: f64,
    pub rate_mps: f64,
    pub elevation_rad: f64,
}

/// Static receiver observing the reference constellation, without noise
#[derive(Debug, Clone)]
pub struct Scenario {
    /// True reception time
    pub t: GpsTime,
    pub rx: Position,
    pub clock_bias_m: f64,
    pub clock_drift_m_s: f64,
    pub message: NavigationMessage,
    /// Simulate atmospheric delays
    pub atmosphere: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        let message = SatelliteId::all()
            .fold(NavigationMessage::default(), |msg, id| {
                msg.with_ephemeris(reference_ephemeris(id.prn())).unwrap()
            })
            .with_iono(KbModel::new(IONO_ALPHA, IONO_BETA));

        Self {
            t: GpsTime::from_week_tow(REFERENCE_WEEK, REFERENCE_TOE_S + 600.0),
            rx: Position::from_lat_lon_alt_deg(37.42, -122.08, 15.0),
            clock_bias_m: 12_345.678,
            clock_drift_m_s: 2.5,
            message,
            atmosphere: false,
        }
    }
}

impl Scenario {
    /// Same scenario, described by another [NavigationMessage]
    pub fn with_message(mut self, message: NavigationMessage) -> Self {
        self.message = message;
        self
    }

    pub fn with_atmosphere(mut self) -> Self {
        self.atmosphere = true;
        self
    }

    /// Same scenario, `dt_s` later
    pub fn later(&self, dt_s: f64) -> Self {
        let mut scenario = self.clone();
        scenario.t = self.t.add_seconds(dt_s).unwrap();
        scenario
    }

    /// Estimator configuration that matches this scenario
    pub fn config(&self) -> Config {
        let modeling = if self.atmosphere {
            Modeling::default()
        } else {
            Modeling::default().without_atmosphere()
        };
        Config::default().with_modeling(modeling)
    }

    /// Receiver time of week at reception (s)
    pub fn rx_tow_s(&self) -> f64 {
        self.t.tow_seconds() + self.clock_bias_m / SPEED_OF_LIGHT_M_S
    }

    /// Reception time, in receiver time
    pub fn rx_time(&self) -> GpsTime {
        self.t.nearest_tow(self.rx_tow_s()).unwrap()
    }

    /// Estimator starting point, a few kilometers away from the truth
    pub fn seed(&self) -> Seed {
        Seed {
            position: self.rx.ecef() + Vector3::new(2_500.0, -1_800.0, 3_100.0),
            clock_bias_m: 0.0,
        }
    }

    /// Light time resolution, satellite clock and atmospheric delays
    /// following the estimator models exactly.
    pub fn observe(&self, id: SatelliteId) -> Observation {
        let eph = self.message.ephemeris(id).unwrap();
        let modeling = self.config().modeling;
        let rx = self.rx.ecef();
        let tow = self.t.tow_seconds();

        let mut tau = AVERAGE_TRAVEL_TIME_S;
        for _ in 0..10 {
            let state = eph.position_velocity(tow - tau, &rx, true).unwrap();
            tau = (state.position - rx).norm() / SPEED_OF_LIGHT_M_S;
        }

        let t_tx = tow - tau;
        let state = eph.position_velocity(t_tx, &rx, true).unwrap();
        let (dt_sv, ddt_sv) = eph.clock_offset_drift(t_tx, &modeling).unwrap();

        let geo = self.rx.geodetic();
        let topo = topocentric(&rx, geo.lat_rad, geo.lon_rad, &state.position);

        let atmosphere_m = if self.atmosphere {
            let rtm = BiasRuntime {
                t: GpsTime::from_week_tow(self.t.week(), self.rx_tow_s()),
                rx_geo: geo,
                elevation_rad: topo.elevation_rad,
                azimuth_rad: topo.azimuth_rad,
                frequency_hz: L1_FREQUENCY_HZ,
            };
            let iono = self.message.iono.map(|kb| kb.bias_m(&rtm)).unwrap_or_default();
            iono + TroposphereModel.bias_m(&rtm)
        } else {
            0.0
        };

        let los = (state.position - rx) / topo.range_m;

        Observation {
            id,
            tow_sv_s: t_tx + dt_sv,
            pseudorange_m: topo.range_m + self.clock_bias_m - dt_sv * SPEED_OF_LIGHT_M_S
                + atmosphere_m,
            rate_mps: los.dot(&state.velocity) + self.clock_drift_m_s
                - ddt_sv * SPEED_OF_LIGHT_M_S,
            elevation_rad: topo.elevation_rad,
        }
    }

    /// The `count` highest satellites above 5° of elevation
    pub fn visible(&self, count: usize) -> Vec<SatelliteId> {
        SatelliteId::all()
            .filter(|id| self.message.ephemeris(*id).is_some())
            .map(|id| self.observe(id))
            .filter(|obs| obs.elevation_rad > 5.0_f64.to_radians())
            .sorted_by(|a, b| b.elevation_rad.total_cmp(&a.elevation_rad))
            .take(count)
            .map(|obs| obs.id)
            .sorted()
            .collect()
    }

    fn measurement(&self, obs: &Observation) -> Measurement {
        // satellites may still transmit in previous week
        let tow_sv_nanos = obs.tow_sv_s.rem_euclid(SECONDS_PER_WEEK) * 1.0E9;
        let received = tow_sv_nanos.ceil();
        let mut measurement = Measurement::new(obs.id.sv(), received as i64, SCENARIO_CN0_DBHZ)
            .with_pseudorange_rate(obs.rate_mps, SCENARIO_RATE_SIGMA_MPS);
        measurement.time_offset_nanos = received - tow_sv_nanos;
        measurement
    }

    /// Exact pseudoranges, as the estimator expects them
    pub fn epoch(&self, ids: &[SatelliteId]) -> ReconstructedEpoch {
        let pseudoranges = ids
            .iter()
            .map(|id| {
                let obs = self.observe(*id);
                PseudorangeWithUncertainty {
                    id: *id,
                    measurement: self.measurement(&obs),
                    pseudorange_m: obs.pseudorange_m,
                    uncertainty_m: pseudorange_uncertainty_m(SCENARIO_CN0_DBHZ),
                }
            })
            .collect();

        ReconstructedEpoch {
            rx_tow_s: self.rx_tow_s(),
            pseudoranges,
        }
    }

    /// Raw receiver measurements (nanosecond resolution).
    /// The receiver clock counts GPS nanoseconds.
    pub fn batch(&self, ids: &[SatelliteId]) -> MeasurementBatch {
        self.batch_with_carrier(ids, |_| false)
    }

    /// Raw receiver measurements, with a valid accumulated delta range
    /// for every satellite `locked` returns true for.
    pub fn batch_with_carrier<F: Fn(SatelliteId) -> bool>(
        &self,
        ids: &[SatelliteId],
        locked: F,
    ) -> MeasurementBatch {
        MeasurementBatch {
            clock: ClockMeasurement {
                time_nanos: self.t.nanos() as i64,
                full_bias_nanos: Some(0),
                bias_nanos: Some(0.0),
                ..Default::default()
            },
            measurements: ids
                .iter()
                .map(|id| {
                    let obs = self.observe(*id);
                    let measurement = self.measurement(&obs);
                    if locked(*id) {
                        // carrier range, up to an ambiguity
                        let adr_m = obs.pseudorange_m - 1_000.0 - 10.0 * id.prn() as f64;
                        measurement.with_accumulated_delta_range(adr_m, ADR_STATE_VALID)
                    } else {
                        measurement
                    }
                })
                .collect(),
        }
    }
}
