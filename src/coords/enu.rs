use nalgebra::Matrix3;

use crate::prelude::Vector3;

/// Rotation whose columns are the East, North and Up unit vectors
/// at given geodetic latitude and longitude, expressed in ECEF.
pub fn enu_rotation(lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();
    Matrix3::new(
        -sin_lon,
        -sin_lat * cos_lon,
        cos_lat * cos_lon,
        cos_lon,
        -sin_lat * sin_lon,
        cos_lat * sin_lon,
        0.0,
        cos_lat,
        sin_lat,
    )
}

/// Projects an ECEF vector (position difference or velocity) onto the local ENU frame
pub fn ecef_to_enu(ecef: &Vector3<f64>, lat_rad: f64, lon_rad: f64) -> Vector3<f64> {
    enu_rotation(lat_rad, lon_rad).transpose() * ecef
}

/// Expresses a local ENU vector in ECEF
pub fn enu_to_ecef(enu: &Vector3<f64>, lat_rad: f64, lon_rad: f64) -> Vector3<f64> {
    enu_rotation(lat_rad, lon_rad) * enu
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rotation_is_orthonormal() {
        let r = enu_rotation(0.7, -2.1);
        let id = r.transpose() * r;
        assert!((id - Matrix3::identity()).norm() < 1.0E-12);
        assert!((r.determinant() - 1.0).abs() < 1.0E-12);
    }

    #[test]
    fn equator_greenwich() {
        // at (0, 0): East = +Y, North = +Z, Up = +X
        let enu = ecef_to_enu(&Vector3::new(1.0, 2.0, 3.0), 0.0, 0.0);
        assert!((enu - Vector3::new(2.0, 3.0, 1.0)).norm() < 1.0E-12);

        let ecef = enu_to_ecef(&enu, 0.0, 0.0);
        assert!((ecef - Vector3::new(1.0, 2.0, 3.0)).norm() < 1.0E-12);
    }

    #[test]
    fn north_pole_up() {
        let enu = ecef_to_enu(&Vector3::new(0.0, 0.0, 10.0), 90.0_f64.to_radians(), 0.3);
        assert!((enu[2] - 10.0).abs() < 1.0E-12);
    }
}
