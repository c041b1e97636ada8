//! GPS broadcast ephemeris and satellite clock / orbit models
use crate::{
    constants::{EARTH_GRAVITATION_MU_M3_S2, SECONDS_PER_WEEK},
    math::week_crossover,
    prelude::{Duration, GpsTime, SV},
};

mod clock;
mod kepler;
mod orbit;

pub use clock::ClockCorrection;
pub use kepler::eccentric_anomaly;
pub use orbit::SatelliteState;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPS LNAV [Ephemeris], as broadcast in subframes 1, 2 and 3.
/// Angles are expressed in radians (not semi circles).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ephemeris {
    /// [SV]
    pub sv: SV,
    /// GPS week (not rolled over)
    pub week: u32,
    /// Time of ephemeris, in seconds of week
    pub toe_s: f64,
    /// Time of clock, in seconds of week
    pub toc_s: f64,
    /// Square root of the semi-major axis (m^1/2)
    pub sqrt_a: f64,
    /// Eccentricity
    pub e: f64,
    /// Mean anomaly at reference time
    pub m0: f64,
    /// Mean motion difference (rad/s)
    pub dn: f64,
    /// Inclination at reference time
    pub i0: f64,
    /// Inclination rate (rad/s)
    pub idot: f64,
    /// Longitude of ascending node at weekly epoch
    pub omega0: f64,
    /// Argument of perigee
    pub omega: f64,
    /// Rate of right ascension (rad/s)
    pub omega_dot: f64,
    /// Argument of latitude harmonic corrections (rad)
    pub cuc: f64,
    pub cus: f64,
    /// Orbit radius harmonic corrections (m)
    pub crc: f64,
    pub crs: f64,
    /// Inclination harmonic corrections (rad)
    pub cic: f64,
    pub cis: f64,
    /// Clock bias (s)
    pub af0: f64,
    /// Clock drift (s/s)
    pub af1: f64,
    /// Clock drift rate (s/s²)
    pub af2: f64,
    /// Total group delay (s)
    pub tgd: f64,
    /// Issue of data, ephemeris
    pub iode: u32,
    /// Issue of data, clock
    pub iodc: u32,
    /// Health flags, 0 means healthy
    pub health: u32,
    /// Curve fit interval (hours)
    pub fit_interval_h: f64,
}

impl Ephemeris {
    /// Returns true when no health flag is asserted
    pub fn is_healthy(&self) -> bool {
        self.health == 0
    }

    /// Semi-major axis (m)
    pub fn semi_major_axis(&self) -> f64 {
        self.sqrt_a.powi(2)
    }

    /// Corrected mean motion (rad/s)
    pub fn mean_motion(&self) -> f64 {
        (EARTH_GRAVITATION_MU_M3_S2 / self.semi_major_axis().powi(3)).sqrt() + self.dn
    }

    /// Time of ephemeris as [GpsTime]
    pub fn toe(&self) -> GpsTime {
        GpsTime::from_week_tow(self.week, self.toe_s)
    }

    /// Returns true if this [Ephemeris] may be used at `t`:
    /// `t` lies within `max_age` (or half the curve fit interval, if larger) of toe.
    pub fn is_valid_at(&self, t: GpsTime, max_age: Duration) -> bool {
        let half_fit_s = self.fit_interval_h * 3600.0 / 2.0;
        let window_s = max_age.to_seconds().max(half_fit_s);
        t.seconds_since(&self.toe()).abs() <= window_s
    }

    /// Time from ephemeris reference epoch (s), week crossover accounted for
    pub(crate) fn time_from_toe(&self, tow_s: f64) -> f64 {
        week_crossover(tow_s - self.toe_s)
    }

    /// Time from clock reference epoch (s), week crossover accounted for
    pub(crate) fn time_from_toc(&self, tow_s: f64) -> f64 {
        week_crossover(tow_s - self.toc_s)
    }

    /// Reduces a time of week that may lie beyond week boundaries
    pub(crate) fn wrap_tow(tow_s: f64) -> f64 {
        tow_s.rem_euclid(SECONDS_PER_WEEK)
    }
}

#[cfg(test)]
mod test {
    use crate::{prelude::GpsTime, tests::reference_ephemeris};
    use hifitime::Unit;

    #[test]
    fn validity_window() {
        let eph = reference_ephemeris(1);
        assert!(eph.is_healthy());

        let toe = eph.toe();
        assert!(eph.is_valid_at(toe, Unit::Hour * 4));
        let later = toe.add_seconds(3.0 * 3600.0).unwrap();
        assert!(eph.is_valid_at(later, Unit::Hour * 4));
        let later = toe.add_seconds(5.0 * 3600.0).unwrap();
        assert!(!eph.is_valid_at(later, Unit::Hour * 4));

        // across week boundary
        let t = GpsTime::from_week_tow(eph.week + 1, 0.0);
        let dt = t.seconds_since(&toe);
        assert_eq!(eph.is_valid_at(t, Unit::Hour * 4), dt.abs() <= 4.0 * 3600.0);
    }
}
