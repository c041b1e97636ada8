//! Ground truth relative residual correction
use itertools::Itertools;
use log::debug;

use crate::{
    coords::{ecef_to_geodetic, geodetic_to_ecef, topocentric, GeodeticPosition},
    prelude::{PrnArray, SatelliteId, Vector3},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of highest satellites used to estimate the common clock bias
const CLOCK_CONSENSUS_SATELLITES: usize = 4;

/// Clock consensus never discards below this number of satellites
const CLOCK_CONSENSUS_MIN_SATELLITES: usize = 2;

/// Externally supplied true receiver location
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GroundTruth {
    /// ECEF coordinates (m)
    Ecef(Vector3<f64>),
    /// Latitude and longitude (°), altitude above the ellipsoid (m)
    Lla { lat_deg: f64, lon_deg: f64, alt_m: f64 },
}

impl GroundTruth {
    /// ECEF coordinates (m)
    pub fn ecef(&self) -> Vector3<f64> {
        match self {
            Self::Ecef(ecef) => *ecef,
            Self::Lla {
                lat_deg,
                lon_deg,
                alt_m,
            } => geodetic_to_ecef(&GeodeticPosition::from_degrees(*lat_deg, *lon_deg, *alt_m)),
        }
    }
}

/// Satellite position and pseudorange residual, as obtained at the WLS position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SatelliteResidual {
    pub id: SatelliteId,
    /// ECEF position (m)
    pub position: Vector3<f64>,
    /// Measured minus predicted pseudorange (m). The prediction ignores
    /// the receiver clock, so the clock bias remains in the residual.
    pub residual_m: f64,
}

/// Residuals referenced to the ground truth
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedResiduals {
    /// Corrected residual per satellite (m), NaN for unseen satellites
    pub residuals: PrnArray<f64>,
    /// Common receiver clock bias that was removed (m)
    pub clock_bias_m: f64,
    /// Satellites that defined the clock bias
    pub consensus: Vec<SatelliteId>,
}

/// Re-expresses each residual as if measured from `truth` rather than `wls_ecef`,
/// then removes the receiver clock bias, estimated as the mean adjusted residual
/// of the highest satellites. The satellite deviating the most from the mean is
/// discarded while it deviates by more than `max_deviation_m`, down to 2 satellites.
/// Returns None when `residuals` is empty.
pub fn correct_residuals(
    residuals: &[SatelliteResidual],
    wls_ecef: &Vector3<f64>,
    truth: &GroundTruth,
    max_deviation_m: f64,
) -> Option<CorrectedResiduals> {
    let truth_ecef = truth.ecef();
    let truth_geo = ecef_to_geodetic(&truth_ecef);

    // (id, adjusted residual, elevation from truth)
    let adjusted = residuals
        .iter()
        .map(|sat| {
            let delta_m = (sat.position - wls_ecef).norm() - (sat.position - truth_ecef).norm();
            let topo = topocentric(
                &truth_ecef,
                truth_geo.lat_rad,
                truth_geo.lon_rad,
                &sat.position,
            );
            (sat.id, sat.residual_m + delta_m, topo.elevation_rad)
        })
        .collect::<Vec<_>>();

    let mut consensus = adjusted
        .iter()
        .sorted_by(|(_, _, a), (_, _, b)| b.total_cmp(a))
        .take(CLOCK_CONSENSUS_SATELLITES)
        .map(|(id, residual_m, _)| (*id, *residual_m))
        .collect::<Vec<_>>();

    let clock_bias_m = loop {
        if consensus.is_empty() {
            return None;
        }

        let mean = consensus.iter().map(|(_, r)| r).sum::<f64>() / consensus.len() as f64;

        let (worst, deviation) = consensus
            .iter()
            .map(|(_, r)| (r - mean).abs())
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

        if deviation <= max_deviation_m || consensus.len() <= CLOCK_CONSENSUS_MIN_SATELLITES {
            break mean;
        }

        debug!(
            "({}) - discarded from clock consensus: deviation {:.3}m",
            consensus[worst].0, deviation
        );
        consensus.remove(worst);
    };

    let mut corrected = PrnArray::nan();
    for (id, residual_m, _) in adjusted.iter() {
        corrected.set(*id, residual_m - clock_bias_m);
    }

    Some(CorrectedResiduals {
        residuals: corrected,
        clock_bias_m,
        consensus: consensus.into_iter().map(|(id, _)| id).collect(),
    })
}
