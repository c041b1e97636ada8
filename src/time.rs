//! GPS time representation
use hifitime::{Epoch, TimeScale};

use crate::{
    constants::NANOS_PER_WEEK,
    error::Error,
    math::week_crossover,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// [GpsTime] counts nanoseconds elapsed since the GPS origin
/// (1980-01-06T00:00:00 UTC). It is never negative and decomposes into
/// a week counter and a time of week.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsTime {
    nanos: u64,
}

impl std::fmt::Display for GpsTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:.3}", self.week(), self.tow_seconds())
    }
}

impl GpsTime {
    /// Builds [GpsTime] from nanoseconds since GPS origin
    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Builds [GpsTime] from signed nanoseconds, failing on negative values.
    pub fn try_from_nanos(nanos: i64) -> Result<Self, Error> {
        u64::try_from(nanos)
            .map(Self::from_nanos)
            .map_err(|_| Error::TimeUnderflow)
    }

    /// Builds [GpsTime] from week counter and time of week in nanoseconds
    pub fn from_week_tow_nanos(week: u32, tow_nanos: u64) -> Self {
        Self {
            nanos: week as u64 * NANOS_PER_WEEK + tow_nanos,
        }
    }

    /// Builds [GpsTime] from week counter and time of week in seconds
    pub fn from_week_tow(week: u32, tow_s: f64) -> Self {
        let tow_nanos = (tow_s.max(0.0) * 1.0E9).round() as u64;
        Self::from_week_tow_nanos(week, tow_nanos)
    }

    /// Nanoseconds since GPS origin
    pub fn nanos(&self) -> u64 {
        self.nanos
    }

    /// GPS week counter (not rolled over)
    pub fn week(&self) -> u32 {
        (self.nanos / NANOS_PER_WEEK) as u32
    }

    /// Nanoseconds elapsed within current week
    pub fn tow_nanos(&self) -> u64 {
        self.nanos % NANOS_PER_WEEK
    }

    /// Seconds elapsed within current week
    pub fn tow_seconds(&self) -> f64 {
        self.tow_nanos() as f64 * 1.0E-9
    }

    /// Returns a new [GpsTime] shifted by given amount of seconds
    pub fn add_seconds(&self, dt_s: f64) -> Result<Self, Error> {
        let nanos = self.nanos as i128 + (dt_s * 1.0E9).round() as i128;
        u64::try_from(nanos)
            .map(Self::from_nanos)
            .map_err(|_| Error::TimeUnderflow)
    }

    /// Returns the instant whose time of week is `tow_s` (s) that lies the closest
    /// to `self`, possibly in the previous or the next week.
    /// `tow_s` may exceed one week.
    pub fn nearest_tow(&self, tow_s: f64) -> Result<Self, Error> {
        self.add_seconds(week_crossover(tow_s - self.tow_seconds()))
    }

    /// Seconds elapsed from `rhs` to `self`
    pub fn seconds_since(&self, rhs: &Self) -> f64 {
        (self.nanos as i128 - rhs.nanos as i128) as f64 * 1.0E-9
    }

    /// Converts to an [Epoch] expressed in [TimeScale::GPST]
    pub fn to_epoch(&self) -> Epoch {
        Epoch::from_gpst_nanoseconds(self.nanos)
    }

    /// Builds [GpsTime] from any [Epoch], whatever its [TimeScale].
    /// Leap seconds are accounted for when the [Epoch] is expressed in UTC.
    pub fn from_epoch(epoch: Epoch) -> Result<Self, Error> {
        let gpst = epoch.to_time_scale(TimeScale::GPST);
        let (week, tow_nanos) = gpst.to_time_of_week();
        Ok(Self::from_week_tow_nanos(week, tow_nanos))
    }

    /// Converts to an UTC [Epoch], leap second aware.
    pub fn to_utc_epoch(&self) -> Epoch {
        self.to_epoch().to_time_scale(TimeScale::UTC)
    }

    /// Returns |GPST - UTC| in seconds at this instant
    pub fn leap_seconds(&self) -> f64 {
        // TAI - UTC, and GPST is 19s behind TAI
        self.to_epoch()
            .leap_seconds(true)
            .map(|tai_utc| tai_utc - 19.0)
            .unwrap_or_default()
    }

    /// Day of year in [1; 366], in UTC
    pub fn day_of_year(&self) -> u16 {
        let utc = self.to_utc_epoch();
        // hifitime returns a fractional day count starting at 0.0 on January 1st
        utc.day_of_year().floor() as u16 + 1
    }
}
