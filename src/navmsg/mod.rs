//! Navigation message: frame decoding, storage and assistance
use crate::{
    bias::KbModel,
    ephemeris::Ephemeris,
    error::Error,
    prelude::{Duration, GpsTime, PrnArray, SatelliteId},
};

mod assistance;
pub(crate) mod bits;
mod store;
pub(crate) mod subframe;

pub use assistance::{fetch_with_timeout, AssistanceSource};
pub use store::NavigationMessageStore;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPS L1 C/A navigation message type
pub const GPS_L1CA_MESSAGE_TYPE: u16 = 0x0101;

/// Raw navigation message frame, as delivered by the receiver
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationMessageFrame {
    /// Satellite PRN
    pub prn: u8,
    /// Message type, see [GPS_L1CA_MESSAGE_TYPE]
    pub message_type: u16,
    /// Sub message identifier (subframe number, for GPS L1 C/A)
    pub submessage_id: u8,
    /// Raw payload
    pub data: Vec<u8>,
}

/// GPS to UTC conversion parameters (subframe 4 page 18)
#[derive(Debug, Default, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UtcParameters {
    /// Constant term (s)
    pub a0: f64,
    /// First order term (s/s)
    pub a1: f64,
    /// Reference time of week (s)
    pub tot: f64,
    /// Reference week (8 LSB)
    pub wnt: u32,
    /// Current leap seconds
    pub dt_ls: i32,
    /// Week of future leap second (8 LSB)
    pub wn_lsf: u32,
    /// Day of future leap second
    pub dn: u32,
    /// Future leap seconds
    pub dt_lsf: i32,
}

impl UtcParameters {
    /// GPST - UTC (s) at `t`, prior to any announced leap second event
    pub fn utc_offset_s(&self, t: GpsTime) -> f64 {
        // reference week is only broadcast modulo 256
        let wn_lsb = (t.week() % 256) as i64;
        let mut dweek = wn_lsb - self.wnt as i64;
        if dweek > 127 {
            dweek -= 256;
        } else if dweek < -127 {
            dweek += 256;
        }
        let dt = t.tow_seconds() - self.tot + 604800.0 * dweek as f64;
        self.dt_ls as f64 + self.a0 + self.a1 * dt
    }
}

/// Decoded navigation message: one [Ephemeris] per satellite plus
/// the constellation wide parameters. It is never patched in place:
/// each update produces a new [NavigationMessage].
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NavigationMessage {
    /// Ephemerides, indexed by [SatelliteId]
    pub ephemerides: PrnArray<Option<Ephemeris>>,
    /// Klobuchar ionosphere parameters
    pub iono: Option<KbModel>,
    /// UTC parameters
    pub utc: Option<UtcParameters>,
}

impl NavigationMessage {
    /// Copies and returns [NavigationMessage] with this [Ephemeris] added (or replaced)
    pub fn with_ephemeris(mut self, ephemeris: Ephemeris) -> Result<Self, Error> {
        let id = SatelliteId::try_from(ephemeris.sv)?;
        self.ephemerides.set(id, Some(ephemeris));
        Ok(self)
    }

    /// Copies and returns [NavigationMessage] with ionosphere parameters
    pub fn with_iono(mut self, iono: KbModel) -> Self {
        self.iono = Some(iono);
        self
    }

    /// Copies and returns [NavigationMessage] with UTC parameters
    pub fn with_utc(mut self, utc: UtcParameters) -> Self {
        self.utc = Some(utc);
        self
    }

    /// [Ephemeris] of this satellite, if known
    pub fn ephemeris(&self, id: SatelliteId) -> Option<&Ephemeris> {
        self.ephemerides.get(id).as_ref()
    }

    /// Returns the healthy [Ephemeris] usable at `t`.
    pub fn usable_ephemeris(
        &self,
        id: SatelliteId,
        t: GpsTime,
        max_age: Duration,
    ) -> Result<&Ephemeris, Error> {
        self.ephemeris(id)
            .filter(|eph| eph.is_healthy() && eph.is_valid_at(t, max_age))
            .ok_or(Error::IncompleteNavigationMessage(id.sv()))
    }

    /// Returns true if this message holds an ephemeris for every satellite in `ids`
    pub fn covers(&self, ids: &[SatelliteId]) -> bool {
        ids.iter().all(|id| self.ephemeris(*id).is_some())
    }

    /// Number of satellites described
    pub fn len(&self) -> usize {
        self.ephemerides.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// GPS week of the most recent ephemeris
    pub fn week(&self) -> Option<u32> {
        self.ephemerides.populated().map(|(_, eph)| eph.week).max()
    }
}

impl NavigationMessageFrame {
    /// Returns true for GPS L1 C/A frames, the only ones we decode
    pub fn is_gps_l1ca(&self) -> bool {
        self.message_type == GPS_L1CA_MESSAGE_TYPE
    }

    /// Validated [SatelliteId] of the emitter
    pub fn satellite_id(&self) -> Result<SatelliteId, Error> {
        SatelliteId::new(self.prn)
    }
}
