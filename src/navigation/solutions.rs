//! Navigation solutions
use crate::{
    constants::SPEED_OF_LIGHT_M_S,
    coords::{ecef_to_enu, GeodeticPosition},
    error::Error,
    navigation::{DilutionOfPrecision, SatelliteContribution},
    prelude::{GpsTime, SatelliteId, Vector3},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Receiver position, velocity and clock state, in ECEF.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionVelocitySolution {
    /// Reception time
    pub t: GpsTime,
    /// [x, y, z, clock bias, vx, vy, vz, clock drift]
    /// in meters and meters per second.
    pub state: [f64; 8],
    /// Standard deviations [E, N, U, vE, vN, vU] in meters and meters per second
    pub uncertainty_enu: [f64; 6],
    /// Geodetic coordinates, altitude above the ellipsoid
    pub geodetic: GeodeticPosition,
    /// Velocity in the local ENU frame (m/s)
    pub velocity_enu: Vector3<f64>,
    /// [DilutionOfPrecision]
    pub dop: DilutionOfPrecision,
    /// Satellites that contributed to this solution
    pub contributions: Vec<SatelliteContribution>,
    /// Gauss-Newton iterations spent (outlier rounds included)
    pub iterations: usize,
}

impl PositionVelocitySolution {
    /// Builds a NaN filled solution, reported when nothing could be resolved.
    pub fn nan(t: GpsTime) -> Self {
        Self {
            t,
            state: [f64::NAN; 8],
            uncertainty_enu: [f64::NAN; 6],
            geodetic: GeodeticPosition {
                lat_rad: f64::NAN,
                lon_rad: f64::NAN,
                alt_m: f64::NAN,
            },
            velocity_enu: Vector3::repeat(f64::NAN),
            dop: DilutionOfPrecision::nan(),
            contributions: Vec::new(),
            iterations: 0,
        }
    }

    pub(crate) fn new(
        t: GpsTime,
        position: Vector3<f64>,
        clock_bias_m: f64,
        velocity: Vector3<f64>,
        clock_drift_m_s: f64,
        geodetic: GeodeticPosition,
    ) -> Self {
        Self {
            t,
            state: [
                position[0],
                position[1],
                position[2],
                clock_bias_m,
                velocity[0],
                velocity[1],
                velocity[2],
                clock_drift_m_s,
            ],
            uncertainty_enu: [f64::NAN; 6],
            geodetic,
            velocity_enu: ecef_to_enu(&velocity, geodetic.lat_rad, geodetic.lon_rad),
            dop: DilutionOfPrecision::nan(),
            contributions: Vec::new(),
            iterations: 0,
        }
    }

    /// ECEF position (m)
    pub fn position_ecef(&self) -> Vector3<f64> {
        Vector3::new(self.state[0], self.state[1], self.state[2])
    }

    /// ECEF velocity (m/s)
    pub fn velocity_ecef(&self) -> Vector3<f64> {
        Vector3::new(self.state[4], self.state[5], self.state[6])
    }

    /// Receiver clock bias (m)
    pub fn clock_bias_m(&self) -> f64 {
        self.state[3]
    }

    /// Receiver clock bias (s)
    pub fn clock_bias_s(&self) -> f64 {
        self.state[3] / SPEED_OF_LIGHT_M_S
    }

    /// Receiver clock drift (s/s)
    pub fn clock_drift_s_s(&self) -> f64 {
        self.state[7] / SPEED_OF_LIGHT_M_S
    }

    /// Latitude and longitude in degrees, altitude in meters
    pub fn lat_lon_alt_deg_deg_m(&self) -> (f64, f64, f64) {
        (
            self.geodetic.lat_deg(),
            self.geodetic.lon_deg(),
            self.geodetic.alt_m,
        )
    }

    /// Satellites used
    pub fn satellites(&self) -> Vec<SatelliteId> {
        self.contributions.iter().map(|c| c.id).collect()
    }

    /// Returns true when position and clock bias are defined
    pub fn is_finite(&self) -> bool {
        self.state[..4].iter().all(|v| v.is_finite())
    }
}

/// Outcome of one epoch.
#[derive(Debug, Clone, PartialEq)]
pub enum EpochSolution {
    /// Position, velocity and time resolved
    Solved(PositionVelocitySolution),
    /// Not enough usable satellites: this is not a failure,
    /// the solution is simply undefined for this epoch.
    Insufficient(usize),
    /// Epoch abandoned, previous solution is retained
    Failed(Error),
}

impl EpochSolution {
    /// Returns the solution, NaN filled when undefined at `t`
    pub fn solution_or_nan(&self, t: GpsTime) -> PositionVelocitySolution {
        match self {
            Self::Solved(solution) => solution.clone(),
            _ => PositionVelocitySolution::nan(t),
        }
    }

    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Solved(_))
    }
}
