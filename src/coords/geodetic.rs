use crate::{
    constants::{
        EARTH_ECCENTRICITY_SQ_WGS84 as E2, EARTH_SEMI_MAJOR_AXIS_WGS84 as A,
        EARTH_SEMI_MINOR_AXIS_WGS84 as B,
    },
    prelude::Vector3,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geodetic coordinates on the WGS84 ellipsoid
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeodeticPosition {
    /// Latitude (rad)
    pub lat_rad: f64,
    /// Longitude (rad)
    pub lon_rad: f64,
    /// Altitude above the ellipsoid (m)
    pub alt_m: f64,
}

impl GeodeticPosition {
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self {
            lat_rad: lat_deg.to_radians(),
            lon_rad: lon_deg.to_radians(),
            alt_m,
        }
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat_rad.to_degrees()
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon_rad.to_degrees()
    }
}

/// Prime vertical radius of curvature (m)
fn prime_vertical_radius(lat_rad: f64) -> f64 {
    A / (1.0 - E2 * lat_rad.sin().powi(2)).sqrt()
}

/// Geodetic to ECEF (m)
pub fn geodetic_to_ecef(geo: &GeodeticPosition) -> Vector3<f64> {
    let n = prime_vertical_radius(geo.lat_rad);
    let (sin_lat, cos_lat) = geo.lat_rad.sin_cos();
    let (sin_lon, cos_lon) = geo.lon_rad.sin_cos();
    Vector3::new(
        (n + geo.alt_m) * cos_lat * cos_lon,
        (n + geo.alt_m) * cos_lat * sin_lon,
        (n * (1.0 - E2) + geo.alt_m) * sin_lat,
    )
}

/// Closed form ECEF to geodetic conversion (Heikkinen).
/// Not defined at the center of the Earth.
pub fn ecef_to_geodetic(ecef: &Vector3<f64>) -> GeodeticPosition {
    let (x, y, z) = (ecef[0], ecef[1], ecef[2]);

    let a2 = A * A;
    let b2 = B * B;
    let ep2 = (a2 - b2) / b2;
    let e4 = E2 * E2;

    let p = x.hypot(y);
    let f = 54.0 * b2 * z * z;
    let g = p * p + (1.0 - E2) * z * z - E2 * (a2 - b2);
    let c = e4 * f * p * p / g.powi(3);
    let s = (1.0 + c + (c * c + 2.0 * c).sqrt()).cbrt();
    let k = s + 1.0 + 1.0 / s;
    let pp = f / (3.0 * k * k * g * g);
    let q = (1.0 + 2.0 * e4 * pp).sqrt();

    // rounding can bring this slightly below zero on the polar axis
    let r0_sq = 0.5 * a2 * (1.0 + 1.0 / q)
        - pp * (1.0 - E2) * z * z / (q * (1.0 + q))
        - 0.5 * pp * p * p;
    let r0 = -pp * E2 * p / (1.0 + q) + r0_sq.max(0.0).sqrt();

    let u = ((p - E2 * r0).powi(2) + z * z).sqrt();
    let v = ((p - E2 * r0).powi(2) + (1.0 - E2) * z * z).sqrt();
    let z0 = b2 * z / (A * v);

    GeodeticPosition {
        lat_rad: (z + ep2 * z0).atan2(p),
        lon_rad: y.atan2(x),
        alt_m: u * (1.0 - b2 / (A * v)),
    }
}

/// Iterative ECEF to geodetic conversion.
/// Refines latitude until the update vanishes, altitude is then
/// evaluated with an expression that remains valid at the poles.
pub fn ecef_to_geodetic_iterative(ecef: &Vector3<f64>) -> GeodeticPosition {
    const MAX_ITER: usize = 30;
    const TOLERANCE_RAD: f64 = 1.0E-15;

    let (x, y, z) = (ecef[0], ecef[1], ecef[2]);
    let p = x.hypot(y);

    let mut lat = z.atan2(p * (1.0 - E2));

    for _ in 0..MAX_ITER {
        let n = prime_vertical_radius(lat);
        let next = (z + E2 * n * lat.sin()).atan2(p);
        let delta = (next - lat).abs();
        lat = next;
        if delta < TOLERANCE_RAD {
            break;
        }
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let alt_m = p * cos_lat + z * sin_lat - A * (1.0 - E2 * sin_lat * sin_lat).sqrt();

    GeodeticPosition {
        lat_rad: lat,
        lon_rad: y.atan2(x),
        alt_m,
    }
}
