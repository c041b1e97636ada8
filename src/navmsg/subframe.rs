//! GPS LNAV subframe decoding
use log::trace;
use std::f64::consts::PI;

use crate::{
    error::Error,
    navmsg::bits::{getbits, getbits2, getbitu, getbitu2},
};

const P2_5: f64 = 0.03125;
const P2_11: f64 = 2048.0;
const P2_12: f64 = 4096.0;
const P2_14: f64 = 16384.0;
const P2_16: f64 = 65536.0;
const P2_19: f64 = 1.0 / 524288.0;
const P2_24: f64 = 1.0 / 16777216.0;
const P2_27: f64 = 1.0 / 134217728.0;
const P2_29: f64 = 1.0 / 536870912.0;
const P2_30: f64 = 1.0 / 1073741824.0;
const P2_31: f64 = 1.0 / 2147483648.0;
const P2_33: f64 = 1.0 / 8589934592.0;
const P2_43: f64 = 1.0 / 8796093022208.0;
const P2_50: f64 = 1.0 / 1125899906842624.0;
const P2_55: f64 = 1.0 / 36028797018963968.0;

/// Semi circle to radians
const SC2RAD: f64 = PI;

/// 10 bit week counter rolled over twice since the GPS origin
pub(crate) const WEEK_ROLLOVER_OFFSET: u32 = 2048;

/// Subframe 4 page carrying ionosphere and UTC parameters
const SF4_PAGE18_SV_ID: u32 = 56;

/// Clock and health data
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub(crate) struct Subframe1 {
    pub week: u32,
    pub health: u32,
    pub iodc: u32,
    pub tgd: f64,
    pub toc: f64,
    pub af2: f64,
    pub af1: f64,
    pub af0: f64,
}

/// Ephemeris (first part)
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub(crate) struct Subframe2 {
    pub iode: u32,
    pub crs: f64,
    pub dn: f64,
    pub m0: f64,
    pub cuc: f64,
    pub e: f64,
    pub cus: f64,
    pub sqrt_a: f64,
    pub toe: f64,
    pub fit_flag: bool,
}

/// Ephemeris (second part)
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub(crate) struct Subframe3 {
    pub cic: f64,
    pub omega0: f64,
    pub cis: f64,
    pub i0: f64,
    pub crc: f64,
    pub omega: f64,
    pub omega_dot: f64,
    pub iode: u32,
    pub idot: f64,
}

/// Subframe 4, page 18
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub(crate) struct IonoUtcPage {
    pub alpha: [f64; 4],
    pub beta: [f64; 4],
    pub a0: f64,
    pub a1: f64,
    pub tot: f64,
    pub wnt: u32,
    pub dt_ls: i32,
    pub wn_lsf: u32,
    pub dn: u32,
    pub dt_lsf: i32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Subframe {
    Clock(Subframe1),
    EphemerisFirst(Subframe2),
    EphemerisSecond(Subframe3),
    IonoUtc(IonoUtcPage),
    /// Almanac and other pages we do not need
    Unused(u32),
}

/// Decodes one packed subframe (parity bits included), returning its
/// time of week (s) and content.
pub(crate) fn decode(buf: &[u8]) -> Result<(u32, Subframe), Error> {
    let tow = getbitu(buf, 30, 17) * 6;
    let id = getbitu(buf, 49, 3);

    let subframe = match id {
        1 => Subframe::Clock(decode_subframe1(buf)),
        2 => Subframe::EphemerisFirst(decode_subframe2(buf)),
        3 => Subframe::EphemerisSecond(decode_subframe3(buf)),
        4 if getbitu(buf, 62, 6) == SF4_PAGE18_SV_ID => Subframe::IonoUtc(decode_page18(buf)),
        4 | 5 => Subframe::Unused(id),
        _ => return Err(Error::InvalidFrame("invalid subframe id")),
    };

    trace!("subframe {} tow={}: {:?}", id, tow, subframe);
    Ok((tow, subframe))
}

fn decode_subframe1(buf: &[u8]) -> Subframe1 {
    Subframe1 {
        week: getbitu(buf, 60, 10) + WEEK_ROLLOVER_OFFSET,
        health: getbitu(buf, 76, 6),
        iodc: getbitu2(buf, 82, 2, 210, 8),
        tgd: getbits(buf, 196, 8) as f64 * P2_31,
        toc: getbitu(buf, 218, 16) as f64 * 16.0,
        af2: getbits(buf, 240, 8) as f64 * P2_55,
        af1: getbits(buf, 248, 16) as f64 * P2_43,
        af0: getbits(buf, 270, 22) as f64 * P2_31,
    }
}

fn decode_subframe2(buf: &[u8]) -> Subframe2 {
    Subframe2 {
        iode: getbitu(buf, 60, 8),
        crs: getbits(buf, 68, 16) as f64 * P2_5,
        dn: getbits(buf, 90, 16) as f64 * P2_43 * SC2RAD,
        m0: getbits2(buf, 106, 8, 120, 24) as f64 * P2_31 * SC2RAD,
        cuc: getbits(buf, 150, 16) as f64 * P2_29,
        e: getbitu2(buf, 166, 8, 180, 24) as f64 * P2_33,
        cus: getbits(buf, 210, 16) as f64 * P2_29,
        sqrt_a: getbitu2(buf, 226, 8, 240, 24) as f64 * P2_19,
        toe: getbitu(buf, 270, 16) as f64 * 16.0,
        fit_flag: getbitu(buf, 286, 1) == 1,
    }
}

fn decode_subframe3(buf: &[u8]) -> Subframe3 {
    Subframe3 {
        cic: getbits(buf, 60, 16) as f64 * P2_29,
        omega0: getbits2(buf, 76, 8, 90, 24) as f64 * P2_31 * SC2RAD,
        cis: getbits(buf, 120, 16) as f64 * P2_29,
        i0: getbits2(buf, 136, 8, 150, 24) as f64 * P2_31 * SC2RAD,
        crc: getbits(buf, 180, 16) as f64 * P2_5,
        omega: getbits2(buf, 196, 8, 210, 24) as f64 * P2_31 * SC2RAD,
        omega_dot: getbits(buf, 240, 24) as f64 * P2_43 * SC2RAD,
        iode: getbitu(buf, 270, 8),
        idot: getbits(buf, 278, 14) as f64 * P2_43 * SC2RAD,
    }
}

fn decode_page18(buf: &[u8]) -> IonoUtcPage {
    IonoUtcPage {
        alpha: [
            getbits(buf, 68, 8) as f64 * P2_30,
            getbits(buf, 76, 8) as f64 * P2_27,
            getbits(buf, 90, 8) as f64 * P2_24,
            getbits(buf, 98, 8) as f64 * P2_24,
        ],
        beta: [
            getbits(buf, 106, 8) as f64 * P2_11,
            getbits(buf, 120, 8) as f64 * P2_14,
            getbits(buf, 128, 8) as f64 * P2_16,
            getbits(buf, 136, 8) as f64 * P2_16,
        ],
        a1: getbits(buf, 150, 24) as f64 * P2_50,
        a0: getbits2(buf, 180, 24, 210, 8) as f64 * P2_30,
        tot: getbitu(buf, 218, 8) as f64 * P2_12,
        wnt: getbitu(buf, 226, 8),
        dt_ls: getbits(buf, 240, 8),
        wn_lsf: getbitu(buf, 248, 8),
        dn: getbitu(buf, 256, 8),
        dt_lsf: getbits(buf, 270, 8),
    }
}


#[cfg(test)]
mod test {
    use super::{decode, encoder, Subframe};
    use crate::tests::reference_ephemeris;

    #[test]
    fn ephemeris_subframes() {
        let eph = reference_ephemeris(12);
        let [sf1, sf2, sf3] = encoder::encode_ephemeris(&eph, 345_600);

        let (tow, sf1) = decode(&sf1).unwrap();
        assert_eq!(tow, 345_600);
        match sf1 {
            Subframe::Clock(sf1) => {
                assert_eq!(sf1.week, eph.week);
                assert_eq!(sf1.iodc, eph.iodc);
                assert_eq!(sf1.toc, eph.toc_s);
                assert!((sf1.af0 - eph.af0).abs() < 1.0E-9);
                assert!((sf1.tgd - eph.tgd).abs() < 1.0E-9);
            },
            _ => panic!("expecting subframe 1"),
        }

        match decode(&sf2).unwrap().1 {
            Subframe::EphemerisFirst(sf2) => {
                assert_eq!(sf2.iode, eph.iode);
                assert!((sf2.sqrt_a - eph.sqrt_a).abs() < 1.0E-5);
                assert!((sf2.e - eph.e).abs() < 1.0E-9);
                assert!((sf2.m0 - eph.m0).abs() < 1.0E-8);
                assert_eq!(sf2.toe, eph.toe_s);
            },
            _ => panic!("expecting subframe 2"),
        }

        match decode(&sf3).unwrap().1 {
            Subframe::EphemerisSecond(sf3) => {
                assert_eq!(sf3.iode, eph.iode);
                assert!((sf3.omega0 - eph.omega0).abs() < 1.0E-8);
                assert!((sf3.i0 - eph.i0).abs() < 1.0E-8);
                assert!((sf3.omega - eph.omega).abs() < 1.0E-8);
                assert!((sf3.omega_dot - eph.omega_dot).abs() < 1.0E-12);
            },
            _ => panic!("expecting subframe 3"),
        }
    }

    #[test]
    fn iono_page() {
        let alpha = [1.1176E-8, 7.4506E-9, -5.9605E-8, -5.9605E-8];
        let beta = [90112.0, 0.0, -196608.0, -65536.0];
        let sf4 = encoder::encode_iono(alpha, beta, 345_618);
        match decode(&sf4).unwrap().1 {
            Subframe::IonoUtc(page) => {
                for i in 0..4 {
                    assert!((page.alpha[i] - alpha[i]).abs() < 1.0E-10);
                    assert_eq!(page.beta[i], beta[i]);
                }
                assert_eq!(page.dt_ls, 18);
                assert_eq!(page.wn_lsf, 137);
            },
            _ => panic!("expecting subframe 4 page 18"),
        }
    }

    #[test]
    fn invalid_subframe_id() {
        let buf = [0_u8; 38];
        assert!(decode(&buf).is_err());
    }
}
