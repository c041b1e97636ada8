use nalgebra::Rotation3;

use crate::{
    constants::{AVERAGE_TRAVEL_TIME_S, EARTH_ANGULAR_VEL_RAD, SPEED_OF_LIGHT_M_S},
    ephemeris::{eccentric_anomaly, Ephemeris},
    error::Error,
    prelude::Vector3,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of fixed point iterations used to resolve the signal
/// travel time, when compensating for Earth rotation.
const SAGNAC_ITERATIONS: usize = 5;

/// Satellite ECEF state
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteState {
    /// ECEF position (m)
    pub position: Vector3<f64>,
    /// ECEF velocity (m/s)
    pub velocity: Vector3<f64>,
}

impl SatelliteState {
    /// Rotates this state about the Z axis by `-θ`, which expresses a state
    /// obtained at transmission time in the ECEF frame of reception time,
    /// θ being the Earth rotation during propagation.
    fn rotated(&self, theta_rad: f64) -> Self {
        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), -theta_rad);
        Self {
            position: rot * self.position,
            velocity: rot * self.velocity,
        }
    }

    /// Expresses this state, obtained at transmission time, in the ECEF frame
    /// of its reception at `rx_ecef` (Sagnac effect). The travel time is resolved
    /// by fixed point iteration, starting from the average travel time.
    pub(crate) fn seen_from(&self, rx_ecef: &Vector3<f64>) -> Self {
        let mut travel_time_s = AVERAGE_TRAVEL_TIME_S;
        let mut rotated = *self;

        for _ in 0..SAGNAC_ITERATIONS {
            rotated = self.rotated(EARTH_ANGULAR_VEL_RAD * travel_time_s);
            travel_time_s = (rotated.position - rx_ecef).norm() / SPEED_OF_LIGHT_M_S;
        }

        rotated
    }
}

impl Ephemeris {
    /// Evaluates the perturbed Kepler orbit at GPS time of week `tow_s`,
    /// returning ECEF position and velocity expressed in the frame of that same instant.
    /// Velocity is obtained by differentiating the closed form expressions.
    pub fn kepler_state(&self, tow_s: f64) -> Result<SatelliteState, Error> {
        let t_k = self.time_from_toe(tow_s);
        let a = self.semi_major_axis();
        let e = self.e;
        let n = self.mean_motion();

        let m_k = self.m0 + n * t_k;
        let e_k = eccentric_anomaly(m_k, e).ok_or(Error::KeplerConvergence(self.sv))?;
        let (sin_e, cos_e) = e_k.sin_cos();
        let one_minus_ecos = 1.0 - e * cos_e;

        let e_dot = n / one_minus_ecos;
        let sqrt_1_e2 = (1.0 - e * e).sqrt();
        let v_k = (sqrt_1_e2 * sin_e).atan2(cos_e - e);
        let v_dot = e_dot * sqrt_1_e2 / one_minus_ecos;

        let phi = v_k + self.omega;
        let (sin_2phi, cos_2phi) = (2.0 * phi).sin_cos();

        // second harmonic perturbations
        let du = self.cus * sin_2phi + self.cuc * cos_2phi;
        let dr = self.crs * sin_2phi + self.crc * cos_2phi;
        let di = self.cis * sin_2phi + self.cic * cos_2phi;

        let u_k = phi + du;
        let r_k = a * one_minus_ecos + dr;
        let i_k = self.i0 + self.idot * t_k + di;

        let u_dot = v_dot * (1.0 + 2.0 * (self.cus * cos_2phi - self.cuc * sin_2phi));
        let r_dot = a * e * sin_e * e_dot + 2.0 * v_dot * (self.crs * cos_2phi - self.crc * sin_2phi);
        let i_dot = self.idot + 2.0 * v_dot * (self.cis * cos_2phi - self.cic * sin_2phi);

        let (sin_u, cos_u) = u_k.sin_cos();
        let (x_p, y_p) = (r_k * cos_u, r_k * sin_u);
        let x_p_dot = r_dot * cos_u - r_k * u_dot * sin_u;
        let y_p_dot = r_dot * sin_u + r_k * u_dot * cos_u;

        let omega_dot_k = self.omega_dot - EARTH_ANGULAR_VEL_RAD;
        let omega_k = self.omega0 + omega_dot_k * t_k - EARTH_ANGULAR_VEL_RAD * self.toe_s;

        let (sin_o, cos_o) = omega_k.sin_cos();
        let (sin_i, cos_i) = i_k.sin_cos();

        let x = x_p * cos_o - y_p * cos_i * sin_o;
        let y = x_p * sin_o + y_p * cos_i * cos_o;
        let z = y_p * sin_i;

        let vx = x_p_dot * cos_o - y_p_dot * cos_i * sin_o + y_p * sin_i * sin_o * i_dot
            - y * omega_dot_k;
        let vy = x_p_dot * sin_o + y_p_dot * cos_i * cos_o - y_p * sin_i * cos_o * i_dot
            + x * omega_dot_k;
        let vz = y_p_dot * sin_i + y_p * cos_i * i_dot;

        Ok(SatelliteState {
            position: Vector3::new(x, y, z),
            velocity: Vector3::new(vx, vy, vz),
        })
    }

    /// Satellite state at GPS transmission time `tx_tow_s`, as seen by a receiver
    /// located at `rx_ecef`. When `earth_rotation` is set, the state is rotated
    /// by the Earth rotation during signal propagation (see [SatelliteState::seen_from]).
    pub fn position_velocity(
        &self,
        tx_tow_s: f64,
        rx_ecef: &Vector3<f64>,
        earth_rotation: bool,
    ) -> Result<SatelliteState, Error> {
        let state = self.kepler_state(tx_tow_s)?;

        if earth_rotation {
            Ok(state.seen_from(rx_ecef))
        } else {
            Ok(state)
        }
    }
}
