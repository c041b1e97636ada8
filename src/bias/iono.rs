use std::f64::consts::PI;

use crate::{
    bias::{Bias, BiasRuntime},
    constants::{L1_FREQUENCY_HZ, SPEED_OF_LIGHT_M_S},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nighttime (DC) vertical delay of the Klobuchar model (s)
pub(crate) const KB_DC_DELAY_S: f64 = 5.0E-9;

/// Minimal period of the Klobuchar model cosine (s)
const KB_MIN_PERIOD_S: f64 = 72.0E3;

/// Klobuchar Model, built from the broadcast ionosphere parameters
#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KbModel {
    /// alpha coefficients
    pub alpha: [f64; 4],
    /// beta coefficients
    pub beta: [f64; 4],
    /// ionosphere layer height in [km] for this model
    pub h_km: f64,
}

impl KbModel {
    /// Thin shell height used by GPS
    pub const DEFAULT_HEIGHT_KM: f64 = 350.0;

    /// Builds a [KbModel] from broadcast coefficients
    pub fn new(alpha: [f64; 4], beta: [f64; 4]) -> Self {
        Self {
            alpha,
            beta,
            h_km: Self::DEFAULT_HEIGHT_KM,
        }
    }

    fn polynomial(coefs: &[f64; 4], phi_m_sc: f64) -> f64 {
        coefs
            .iter()
            .enumerate()
            .map(|(i, c)| c * phi_m_sc.powi(i as i32))
            .sum()
    }

    /// Slant ionosphere delay (s) at the signal frequency
    pub(crate) fn delay_s(&self, rtm: &BiasRuntime) -> f64 {
        const PHI_P: f64 = 78.3;
        const R_EARTH: f64 = 6378.0;
        const LAMBDA_P: f64 = 291.0;

        let (phi_u, lambda_u) = (rtm.rx_geo.lat_rad, rtm.rx_geo.lon_rad);
        let (phi_p, lambda_p) = (PHI_P.to_radians(), LAMBDA_P.to_radians());

        let fract = R_EARTH / (R_EARTH + self.h_km);

        let elev_rad = rtm.clamped_elevation_rad();
        let azim_rad = rtm.azimuth_rad;

        // earth central angle between user and pierce point
        let psi = PI / 2.0 - elev_rad - (fract * elev_rad.cos()).asin();
        let phi_i = (phi_u.sin() * psi.cos() + phi_u.cos() * psi.sin() * azim_rad.cos()).asin();
        let lambda_i = lambda_u + azim_rad.sin() * psi / phi_i.cos();

        // geomagnetic latitude of the pierce point
        let phi_m = (phi_i.sin() * phi_p.sin()
            + phi_i.cos() * phi_p.cos() * (lambda_i - lambda_p).cos())
        .asin();

        let mut t_s = 43.2E3 * lambda_i / PI + rtm.t.tow_seconds();
        t_s = t_s.rem_euclid(86.4E3);

        let a_i = Self::polynomial(&self.alpha, phi_m / PI).max(0.0);
        let p_i = Self::polynomial(&self.beta, phi_m / PI).max(KB_MIN_PERIOD_S);

        let x_i = 2.0 * PI * (t_s - 50400.0) / p_i;
        let f = 1.0 / (1.0 - (fract * elev_rad.cos()).powi(2)).sqrt();

        let vertical = if x_i.abs() < PI / 2.0 {
            KB_DC_DELAY_S + a_i * x_i.cos()
        } else {
            KB_DC_DELAY_S
        };

        f * vertical * (L1_FREQUENCY_HZ / rtm.frequency_hz).powi(2)
    }
}

impl Bias for KbModel {
    fn bias_m(&self, rtm: &BiasRuntime) -> f64 {
        self.delay_s(rtm) * SPEED_OF_LIGHT_M_S
    }
}
