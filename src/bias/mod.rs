//! Atmospheric delay models
use crate::{coords::GeodeticPosition, time::GpsTime};

pub(crate) mod iono;
pub use iono::KbModel;

pub(crate) mod tropo;
pub use tropo::TroposphereModel;

/// Elevation below which slant delays are evaluated at this angle.
pub(crate) const MIN_ELEVATION_RAD: f64 = 2.0 * std::f64::consts::PI / 180.0;

/// Everything a delay model needs to know about one receiver / satellite pair
#[derive(Debug, Clone, Copy)]
pub(crate) struct BiasRuntime {
    /// GPS time
    pub t: GpsTime,
    /// Receiver geodetic position
    pub rx_geo: GeodeticPosition,
    /// Satellite elevation (rad)
    pub elevation_rad: f64,
    /// Satellite azimuth (rad)
    pub azimuth_rad: f64,
    /// Signal frequency (Hz)
    pub frequency_hz: f64,
}

impl BiasRuntime {
    /// Elevation clamped to the lowest angle the models support
    pub(crate) fn clamped_elevation_rad(&self) -> f64 {
        self.elevation_rad.max(MIN_ELEVATION_RAD)
    }
}

/// Slant path delay model
pub(crate) trait Bias {
    /// Delay in meters, for given runtime
    fn bias_m(&self, rtm: &BiasRuntime) -> f64;
}
