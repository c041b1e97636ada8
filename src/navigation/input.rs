use log::debug;
use nalgebra::{DMatrix, DVector, MatrixXx4};

use crate::{
    bias::{Bias, BiasRuntime, KbModel, TroposphereModel},
    cfg::Config,
    constants::L1_FREQUENCY_HZ,
    coords::{ecef_to_geodetic, topocentric},
    ephemeris::{ClockCorrection, Ephemeris, SatelliteState},
    math::weight_matrix,
    measurement::PseudorangeWithUncertainty,
    prelude::{GpsTime, SatelliteId, Vector3},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Satellite retained for this epoch: its ephemeris is usable,
/// its time of transmission and its orbit at that time have been resolved.
#[derive(Debug, Clone)]
pub(crate) struct Candidate<'a> {
    pub pseudorange: PseudorangeWithUncertainty,
    pub ephemeris: &'a Ephemeris,
    pub clock: ClockCorrection,
    /// State at transmission time, in the frame of that instant
    pub orbit: SatelliteState,
}

impl Candidate<'_> {
    pub fn id(&self) -> SatelliteId {
        self.pseudorange.id
    }
}

/// Contribution of one satellite to the navigation solution,
/// evaluated at the current receiver estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteContribution {
    /// Satellite
    pub id: SatelliteId,
    /// ECEF state at transmission time, in the frame of reception time
    pub state: SatelliteState,
    /// Onboard clock correction
    pub clock: ClockCorrection,
    /// Elevation from receiver (rad)
    pub elevation_rad: f64,
    /// Azimuth from receiver (rad)
    pub azimuth_rad: f64,
    /// Geometric range (m)
    pub range_m: f64,
    /// Ionosphere delay (m), null when not modeled
    pub iono_m: f64,
    /// Troposphere delay (m), null when not modeled
    pub tropo_m: f64,
    /// Measured minus predicted pseudorange (m), the prediction
    /// accounting for the receiver clock bias estimate
    pub residual_m: f64,
    /// Pseudorange standard deviation (m)
    pub sigma_m: f64,
    /// Measured pseudorange rate (m/s)
    pub rate_mps: f64,
    /// Pseudorange rate standard deviation (m/s)
    pub rate_sigma_mps: f64,
}

impl SatelliteContribution {
    /// Unit line of sight vector, from receiver to satellite
    pub fn line_of_sight(&self, rx_ecef: &Vector3<f64>) -> Vector3<f64> {
        (self.state.position - rx_ecef) / self.range_m
    }
}

/// One Gauss-Newton linearization: geometry matrix, residual vector
/// and optional weights. Row `i` describes `contributions[i]`.
#[derive(Debug, Clone)]
pub(crate) struct Input {
    pub contributions: Vec<SatelliteContribution>,
    pub g: MatrixXx4<f64>,
    pub b: DVector<f64>,
    pub w: Option<DMatrix<f64>>,
}

impl Input {
    /// Linearizes the pseudorange equations about (`rx_ecef`, `clock_bias_m`),
    /// one row per candidate. Atmospheric delays are only evaluated when `atmosphere` is set.
    pub fn new(
        cfg: &Config,
        t: GpsTime,
        iono: Option<&KbModel>,
        candidates: &[Candidate],
        rx_ecef: &Vector3<f64>,
        clock_bias_m: f64,
        atmosphere: bool,
    ) -> Self {
        let rx_geo = ecef_to_geodetic(rx_ecef);
        let modeling = &cfg.modeling;

        let contributions = candidates
            .iter()
            .map(|cd| {
                let state = if modeling.earth_rotation {
                    cd.orbit.seen_from(rx_ecef)
                } else {
                    cd.orbit
                };

                let topo = topocentric(rx_ecef, rx_geo.lat_rad, rx_geo.lon_rad, &state.position);

                let rtm = BiasRuntime {
                    t,
                    rx_geo,
                    elevation_rad: topo.elevation_rad,
                    azimuth_rad: topo.azimuth_rad,
                    frequency_hz: L1_FREQUENCY_HZ,
                };

                let iono_m = match iono {
                    Some(model) if atmosphere && modeling.iono_delay => model.bias_m(&rtm),
                    _ => 0.0,
                };

                let tropo_m = if atmosphere && modeling.tropo_delay {
                    TroposphereModel.bias_m(&rtm)
                } else {
                    0.0
                };

                let predicted_m =
                    topo.range_m - cd.clock.offset_m() + iono_m + tropo_m + clock_bias_m;

                let measurement = &cd.pseudorange.measurement;

                SatelliteContribution {
                    id: cd.id(),
                    state,
                    clock: cd.clock,
                    elevation_rad: topo.elevation_rad,
                    azimuth_rad: topo.azimuth_rad,
                    range_m: topo.range_m,
                    iono_m,
                    tropo_m,
                    residual_m: cd.pseudorange.pseudorange_m - predicted_m,
                    sigma_m: cd.pseudorange.uncertainty_m,
                    rate_mps: measurement.pseudorange_rate_mps,
                    rate_sigma_mps: measurement.pseudorange_rate_uncertainty_mps,
                }
            })
            .collect::<Vec<_>>();

        let nrows = contributions.len();
        let mut g = MatrixXx4::<f64>::zeros(nrows);
        let mut b = DVector::<f64>::zeros(nrows);

        for (i, contrib) in contributions.iter().enumerate() {
            let los = contrib.line_of_sight(rx_ecef);
            g[(i, 0)] = -los[0];
            g[(i, 1)] = -los[1];
            g[(i, 2)] = -los[2];
            g[(i, 3)] = 1.0;
            b[i] = contrib.residual_m;

            debug!(
                "{} ({}) - elev={:.2}° residual={:.3}m iono={:.3}m tropo={:.3}m",
                t,
                contrib.id,
                contrib.elevation_rad.to_degrees(),
                contrib.residual_m,
                contrib.iono_m,
                contrib.tropo_m
            );
        }

        let w = if modeling.weighted {
            let sigmas = contributions.iter().map(|c| c.sigma_m).collect::<Vec<_>>();
            let w = weight_matrix(&sigmas);
            if w.is_none() {
                debug!("{} - singular covariance: unweighted resolution", t);
            }
            w
        } else {
            None
        };

        Self {
            contributions,
            g,
            b,
            w,
        }
    }

    /// Number of satellites (rows)
    pub fn len(&self) -> usize {
        self.contributions.len()
    }
}
