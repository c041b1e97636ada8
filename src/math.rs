//! Small numerical helpers shared by the models and the estimator
use nalgebra::{DMatrix, DVector, Matrix4, MatrixXx4, Vector4};

use crate::{
    constants::{SECONDS_PER_WEEK, SPEED_OF_LIGHT_M_S},
    error::Error,
};

/// Determinant below which the measurement covariance is considered singular
pub(crate) const COVARIANCE_DET_TOLERANCE: f64 = 1.0E-100;

/// Wraps a time difference (s) into [-half week, +half week],
/// to account for week crossovers between two time of week.
pub fn week_crossover(dt_s: f64) -> f64 {
    const HALF_WEEK: f64 = SECONDS_PER_WEEK / 2.0;
    if dt_s > HALF_WEEK {
        dt_s - SECONDS_PER_WEEK
    } else if dt_s < -HALF_WEEK {
        dt_s + SECONDS_PER_WEEK
    } else {
        dt_s
    }
}

/// Converts a distance (m) to the equivalent light travel time (s)
pub fn meters_to_seconds(m: f64) -> f64 {
    m / SPEED_OF_LIGHT_M_S
}

/// Builds the diagonal weight matrix (inverse covariance) from per row standard deviations.
/// Returns None when the covariance is singular: the caller should then run
/// an unweighted resolution.
pub(crate) fn weight_matrix(sigmas: &[f64]) -> Option<DMatrix<f64>> {
    let covar = DMatrix::from_diagonal(&DVector::from_iterator(
        sigmas.len(),
        sigmas.iter().map(|s| s.powi(2)),
    ));

    if covar.determinant().abs() <= COVARIANCE_DET_TOLERANCE {
        return None;
    }

    covar.try_inverse()
}

/// Output of one (weighted) least squares resolution
#[derive(Debug, Clone)]
pub(crate) struct LeastSquares {
    /// Correction vector
    pub dx: Vector4<f64>,
    /// (G^T W G)⁻¹, estimate covariance
    pub q: Matrix4<f64>,
}

/// Solves dx = (G^T W G)⁻¹ G^T W b.
/// Identity weights are used when `w` is None.
pub(crate) fn least_squares(
    g: &MatrixXx4<f64>,
    w: Option<&DMatrix<f64>>,
    b: &DVector<f64>,
) -> Result<LeastSquares, Error> {
    let gt = g.transpose();

    let gt_w = match w {
        Some(w) => gt * w,
        None => gt,
    };

    let q = (&gt_w * g)
        .try_inverse()
        .ok_or(Error::MatrixInversion)?;

    let dx = q * (gt_w * b);

    Ok(LeastSquares { dx, q })
}
