use log::error;

use crate::{
    cfg::Modeling,
    constants::{RELATIVISTIC_F, SPEED_OF_LIGHT_M_S},
    ephemeris::{eccentric_anomaly, Ephemeris},
    error::Error,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Convergence criterion of the transmission time iteration (s)
const CLOCK_TOLERANCE_S: f64 = 1.0E-12;

/// Maximal number of transmission time iterations
const CLOCK_MAX_ITER: usize = 100;

/// Onboard clock correction at transmission time
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockCorrection {
    /// Onboard clock offset to GPS time (s), relativistic
    /// and group delay terms included when modeled
    pub offset_s: f64,
    /// Onboard clock drift (s/s)
    pub drift_s_s: f64,
    /// GPS time of transmission, in seconds of week
    pub tx_tow_s: f64,
}

impl ClockCorrection {
    /// Clock offset expressed in meters of delay
    pub fn offset_m(&self) -> f64 {
        self.offset_s * SPEED_OF_LIGHT_M_S
    }

    /// Clock drift expressed in m/s
    pub fn drift_m_s(&self) -> f64 {
        self.drift_s_s * SPEED_OF_LIGHT_M_S
    }
}

impl Ephemeris {
    /// Evaluates the onboard clock offset (s) and drift (s/s)
    /// at GPS time of week `tow_s`.
    pub(crate) fn clock_offset_drift(
        &self,
        tow_s: f64,
        modeling: &Modeling,
    ) -> Result<(f64, f64), Error> {
        let mut offset = 0.0;
        let mut drift = 0.0;

        if modeling.sv_clock_bias {
            let dt = self.time_from_toc(tow_s);
            offset += self.af0 + self.af1 * dt + self.af2 * dt.powi(2);
            drift += self.af1 + 2.0 * self.af2 * dt;
        }

        if modeling.relativistic_clock_bias {
            let t_k = self.time_from_toe(tow_s);
            let n = self.mean_motion();
            let m = self.m0 + n * t_k;
            let e_k = eccentric_anomaly(m, self.e).ok_or(Error::KeplerConvergence(self.sv))?;
            let (sin_e, cos_e) = e_k.sin_cos();
            let e_dot = n / (1.0 - self.e * cos_e);
            offset += RELATIVISTIC_F * self.e * self.sqrt_a * sin_e;
            drift += RELATIVISTIC_F * self.e * self.sqrt_a * cos_e * e_dot;
        }

        if modeling.sv_total_group_delay {
            offset -= self.tgd;
        }

        Ok((offset, drift))
    }

    /// Determines the GPS time of transmission from the satellite
    /// time of transmission `tow_sv_s` (seconds of week, onboard clock).
    /// Since the correction depends on the transmission time itself,
    /// `t = t_sv - Δt_sv(t)` is iterated until it settles.
    pub fn clock_correction(
        &self,
        tow_sv_s: f64,
        modeling: &Modeling,
    ) -> Result<ClockCorrection, Error> {
        let mut t = tow_sv_s;
        for _ in 0..CLOCK_MAX_ITER {
            let (offset_s, drift_s_s) = self.clock_offset_drift(t, modeling)?;
            let next = tow_sv_s - offset_s;
            if (next - t).abs() < CLOCK_TOLERANCE_S {
                return Ok(ClockCorrection {
                    offset_s,
                    drift_s_s,
                    tx_tow_s: Self::wrap_tow(next),
                });
            }
            t = next;
        }
        error!("{} - clock correction did not converge", self.sv);
        Err(Error::ClockConvergence(self.sv))
    }
}
