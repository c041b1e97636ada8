use crate::bias::{Bias, BiasRuntime};

mod unb3;

/// Elevation mapping function, valid down to ~2° of elevation.
/// Reduces to 1 at zenith.
pub(crate) fn mapping_function(elevation_rad: f64) -> f64 {
    1.001_f64 / (0.002001_f64 + elevation_rad.sin().powi(2)).sqrt()
}

/// EGNOS troposphere model, based on the UNB3 meteorological
/// tables. Requires no external input.
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct TroposphereModel;

impl TroposphereModel {
    /// Zenith (wet, dry) delays in meters, at given latitude (°),
    /// height (m) and day of year.
    pub fn zenith_delays(lat_ddeg: f64, height_m: f64, day_of_year: f64) -> (f64, f64) {
        unb3::unb3_model(lat_ddeg, height_m, day_of_year)
    }
}

impl Bias for TroposphereModel {
    fn bias_m(&self, rtm: &BiasRuntime) -> f64 {
        let (zwd, zdd) = Self::zenith_delays(
            rtm.rx_geo.lat_deg(),
            rtm.rx_geo.alt_m,
            rtm.t.day_of_year() as f64,
        );
        (zwd + zdd) * mapping_function(rtm.clamped_elevation_rad())
    }
}
