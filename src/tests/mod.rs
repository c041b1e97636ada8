mod estimator;
mod scenario;

pub use scenario::*;

use log::LevelFilter;
use std::{f64::consts::PI, sync::Once};

use crate::{
    ephemeris::Ephemeris,
    prelude::{Constellation, SV},
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// Reference GPS week
pub const REFERENCE_WEEK: u32 = 2190;

/// Reference time of ephemeris (s of week)
pub const REFERENCE_TOE_S: f64 = 345_600.0;

/// Wraps an angle into [-π; π)
fn wrap_angle(rad: f64) -> f64 {
    (rad + PI).rem_euclid(2.0 * PI) - PI
}

/// Synthetic healthy [Ephemeris] of a Walker like constellation:
/// 6 planes spaced by 60°, 5 slots per plane (PRN 31 and 32 are spares).
pub fn reference_ephemeris(prn: u8) -> Ephemeris {
    let index = (prn as usize).saturating_sub(1);
    let (plane, slot) = (index % 6, index / 6);

    let omega = wrap_angle(prn as f64 * 0.7);

    // argument of latitude at toe
    let mut u0_deg = slot as f64 * 72.0 + plane as f64 * 12.0;
    if slot == 5 {
        u0_deg += 36.0;
    }

    let iod = (prn as u32 * 7) % 256;

    Ephemeris {
        sv: SV::new(Constellation::GPS, prn),
        week: REFERENCE_WEEK,
        toe_s: REFERENCE_TOE_S,
        toc_s: REFERENCE_TOE_S,
        sqrt_a: 5153.6 + 0.3 * (prn % 5) as f64,
        e: 0.005 + 0.0003 * prn as f64,
        m0: wrap_angle(u0_deg.to_radians() - omega),
        dn: 4.5E-9,
        i0: (55.0 + 0.3 * ((prn % 3) as f64 - 1.0)).to_radians(),
        idot: 1.0E-10,
        omega0: wrap_angle((plane as f64 * 60.0 - 100.0).to_radians()),
        omega,
        omega_dot: -8.0E-9,
        cuc: 1.0E-6,
        cus: 5.0E-6,
        crc: 250.0,
        crs: 40.0,
        cic: 1.0E-7,
        cis: -5.0E-8,
        af0: 1.0E-5 * (prn as f64 - 16.0),
        af1: 1.0E-12,
        af2: 0.0,
        tgd: -5.0E-9,
        iode: iod,
        iodc: iod,
        health: 0,
        fit_interval_h: 4.0,
    }
}
