use std::f64::consts::TAU;

use crate::{coords::ecef_to_enu, prelude::Vector3};

/// Satellite direction as seen from the receiver
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Topocentric {
    /// Azimuth, clockwise from North (rad) in [0; 2π)
    pub azimuth_rad: f64,
    /// Elevation above the local horizon (rad)
    pub elevation_rad: f64,
    /// Geometric range (m)
    pub range_m: f64,
}

/// Azimuth, elevation and range of `target_ecef` from `observer_ecef`,
/// the observer being located at (`lat_rad`, `lon_rad`).
pub fn topocentric(
    observer_ecef: &Vector3<f64>,
    lat_rad: f64,
    lon_rad: f64,
    target_ecef: &Vector3<f64>,
) -> Topocentric {
    let delta = target_ecef - observer_ecef;
    let enu = ecef_to_enu(&delta, lat_rad, lon_rad);

    let mut azimuth_rad = enu[0].atan2(enu[1]);
    if azimuth_rad < 0.0 {
        azimuth_rad += TAU;
    }

    Topocentric {
        azimuth_rad,
        elevation_rad: enu[2].atan2(enu[0].hypot(enu[1])),
        range_m: delta.norm(),
    }
}

#[cfg(test)]
mod test {
    use super::topocentric;
    use crate::{coords::Position, prelude::Vector3};

    #[test]
    fn zenith_and_horizon() {
        let rx = Position::from_lat_lon_alt_deg(0.0, 0.0, 0.0);
        let ecef = rx.ecef();

        let above = topocentric(&ecef, 0.0, 0.0, &(ecef + Vector3::new(20.0E6, 0.0, 0.0)));
        assert!((above.elevation_rad.to_degrees() - 90.0).abs() < 1.0E-9);
        assert!((above.range_m - 20.0E6).abs() < 1.0E-6);

        let east = topocentric(&ecef, 0.0, 0.0, &(ecef + Vector3::new(0.0, 1000.0, 0.0)));
        assert!(east.elevation_rad.abs() < 1.0E-12);
        assert!((east.azimuth_rad.to_degrees() - 90.0).abs() < 1.0E-9);

        let west = topocentric(&ecef, 0.0, 0.0, &(ecef + Vector3::new(0.0, -1000.0, 0.0)));
        assert!((west.azimuth_rad.to_degrees() - 270.0).abs() < 1.0E-9);
    }
}
