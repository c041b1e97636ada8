//! Coordinate transforms: geodetic, local tangent plane and topocentric.
mod enu;
mod geodetic;
mod topocentric;

pub use enu::{ecef_to_enu, enu_rotation, enu_to_ecef};
pub use geodetic::{
    ecef_to_geodetic, ecef_to_geodetic_iterative, geodetic_to_ecef, GeodeticPosition,
};
pub use topocentric::{topocentric, Topocentric};

use crate::prelude::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [Position] carries both ECEF and geodetic coordinates of one point,
/// so each representation is only computed once per epoch.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// ECEF coordinates in meters
    ecef: Vector3<f64>,
    /// Geodetic coordinates
    geodetic: GeodeticPosition,
}

impl Position {
    /// Builds new [Position] from ECEF coordinates expressed in meters.
    pub fn from_ecef(ecef: Vector3<f64>) -> Self {
        Self {
            ecef,
            geodetic: ecef_to_geodetic(&ecef),
        }
    }

    /// Builds new [Position] from geodetic coordinates.
    pub fn from_geodetic(geodetic: GeodeticPosition) -> Self {
        Self {
            geodetic,
            ecef: geodetic_to_ecef(&geodetic),
        }
    }

    /// Builds new [Position] from latitude and longitude in degrees,
    /// altitude above the ellipsoid in meters.
    pub fn from_lat_lon_alt_deg(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self::from_geodetic(GeodeticPosition::from_degrees(lat_deg, lon_deg, alt_m))
    }

    /// ECEF coordinates (m)
    pub fn ecef(&self) -> Vector3<f64> {
        self.ecef
    }

    /// Geodetic coordinates
    pub fn geodetic(&self) -> GeodeticPosition {
        self.geodetic
    }
}
