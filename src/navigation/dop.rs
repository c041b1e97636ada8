use nalgebra::{Matrix3, Matrix4, MatrixXx4};

use crate::{coords::enu_rotation, error::Error};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rotates an ECEF covariance matrix into the local ENU frame
/// at (`lat_rad`, `lon_rad`): Q_enu = Rᵀ Q R.
pub(crate) fn q_enu(q_ecef: &Matrix3<f64>, lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
    let r = enu_rotation(lat_rad, lon_rad);
    r.transpose() * q_ecef * r
}

/// Upper left 3x3 (spatial) block of a 4x4 covariance matrix
pub(crate) fn spatial_block(q: &Matrix4<f64>) -> Matrix3<f64> {
    q.fixed_view::<3, 3>(0, 0).into_owned()
}

/// [DilutionOfPrecision] of the satellites geometry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DilutionOfPrecision {
    /// Geometric DOP
    pub gdop: f64,

    /// Position DOP
    pub pdop: f64,

    /// Horizontal DOP
    pub hdop: f64,

    /// Vertical DOP
    pub vdop: f64,

    /// Temporal DOP
    pub tdop: f64,
}

impl Default for DilutionOfPrecision {
    fn default() -> Self {
        Self::nan()
    }
}

impl DilutionOfPrecision {
    /// Undefined [DilutionOfPrecision]
    pub fn nan() -> Self {
        Self {
            gdop: f64::NAN,
            pdop: f64::NAN,
            hdop: f64::NAN,
            vdop: f64::NAN,
            tdop: f64::NAN,
        }
    }

    /// Creates new [DilutionOfPrecision].
    ///
    /// ## Input
    /// - g: geometry matrix, one row per satellite
    /// - lat_rad, lon_rad: receiver geodetic coordinates
    pub(crate) fn new(g: &MatrixXx4<f64>, lat_rad: f64, lon_rad: f64) -> Result<Self, Error> {
        let g_gt_inv = (g.transpose() * g)
            .try_inverse()
            .ok_or(Error::MatrixInversion)?;

        let q_enu = q_enu(&spatial_block(&g_gt_inv), lat_rad, lon_rad);

        Ok(Self {
            gdop: g_gt_inv.trace().sqrt(),
            tdop: g_gt_inv[(3, 3)].sqrt(),
            pdop: (g_gt_inv[(0, 0)] + g_gt_inv[(1, 1)] + g_gt_inv[(2, 2)]).sqrt(),
            vdop: q_enu[(2, 2)].sqrt(),
            hdop: (q_enu[(0, 0)] + q_enu[(1, 1)]).sqrt(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::{q_enu, DilutionOfPrecision};
    use nalgebra::{Matrix3, MatrixXx4};

    #[test]
    fn enu_rotation_preserves_trace() {
        let q = Matrix3::new(4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0);
        let (lat, lon) = (37.42_f64.to_radians(), -122.08_f64.to_radians());
        let rotated = q_enu(&q, lat, lon);
        assert!((rotated.trace() - q.trace()).abs() < 1.0E-9);
        assert!((rotated - rotated.transpose()).norm() < 1.0E-12);
    }

    #[test]
    fn dop_geometry() {
        // one satellite at zenith, three spread 120° apart on the horizon,
        // receiver on the equator at the Greenwich meridian (ENU = YZX).
        let (s, c) = (120.0_f64.to_radians().sin(), 120.0_f64.to_radians().cos());
        let los = [
            [1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, s, c],
            [0.0, -s, c],
            [0.7071, 0.7071, 0.0],
        ];
        let mut g = MatrixXx4::<f64>::zeros(los.len());
        for (i, u) in los.iter().enumerate() {
            g[(i, 0)] = -u[0];
            g[(i, 1)] = -u[1];
            g[(i, 2)] = -u[2];
            g[(i, 3)] = 1.0;
        }

        let dop = DilutionOfPrecision::new(&g, 0.0, 0.0).unwrap();
        assert!(dop.gdop.is_finite());
        assert!(dop.gdop >= dop.pdop);
        assert!(dop.pdop >= dop.hdop);
        assert!((dop.pdop.powi(2) - dop.hdop.powi(2) - dop.vdop.powi(2)).abs() < 1.0E-9);

        let degenerate = MatrixXx4::<f64>::from_row_slice(&[
            0.0, 0.0, -1.0, 1.0, //
            0.0, 0.0, -1.0, 1.0, //
            0.0, 0.0, -1.0, 1.0, //
            0.0, 0.0, -1.0, 1.0,
        ]);
        assert!(DilutionOfPrecision::new(&degenerate, 0.0, 0.0).is_err());
    }
}
