use log::debug;
use nalgebra::{DVector, Matrix4, MatrixXx4};

use crate::{
    constants::MIN_SATELLITES,
    error::Error,
    math::{least_squares, weight_matrix},
    navigation::SatelliteContribution,
    prelude::Vector3,
};

/// Receiver velocity and clock drift
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct VelocityFix {
    /// ECEF velocity (m/s)
    pub velocity: Vector3<f64>,
    /// Receiver clock drift (m/s)
    pub clock_drift_m_s: f64,
    /// Estimate covariance
    pub q: Matrix4<f64>,
}

/// Resolves receiver velocity and clock drift in a single (non iterative)
/// weighted least squares, from the pseudorange rates of the satellites that
/// contributed to the position fix:
/// ρ̇ - u.v_sat + c.ḋt_sv = -u.v_rx + ḋ
pub(crate) fn solve_velocity(
    contributions: &[SatelliteContribution],
    rx_ecef: &Vector3<f64>,
    weighted: bool,
) -> Result<VelocityFix, Error> {
    let rows = contributions
        .iter()
        .filter(|c| c.rate_mps.is_finite())
        .collect::<Vec<_>>();

    if rows.len() < MIN_SATELLITES {
        return Err(Error::InsufficientSatellites(rows.len()));
    }

    let mut g = MatrixXx4::<f64>::zeros(rows.len());
    let mut b = DVector::<f64>::zeros(rows.len());

    for (i, contrib) in rows.iter().enumerate() {
        let los = contrib.line_of_sight(rx_ecef);
        g[(i, 0)] = -los[0];
        g[(i, 1)] = -los[1];
        g[(i, 2)] = -los[2];
        g[(i, 3)] = 1.0;
        b[i] = contrib.rate_mps - los.dot(&contrib.state.velocity) + contrib.clock.drift_m_s();
    }

    let w = if weighted {
        let sigmas = rows.iter().map(|c| c.rate_sigma_mps).collect::<Vec<_>>();
        weight_matrix(&sigmas)
    } else {
        None
    };

    let lsq = least_squares(&g, w.as_ref(), &b)?;

    let velocity = Vector3::new(lsq.dx[0], lsq.dx[1], lsq.dx[2]);
    debug!(
        "velocity: vx={:.3}m/s vy={:.3}m/s vz={:.3}m/s drift={:.3}m/s",
        velocity[0], velocity[1], velocity[2], lsq.dx[3]
    );

    Ok(VelocityFix {
        velocity,
        clock_drift_m_s: lsq.dx[3],
        q: lsq.q,
    })
}
