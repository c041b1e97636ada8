use log::{debug, info};

use crate::{
    bias::KbModel,
    ephemeris::Ephemeris,
    error::Error,
    navmsg::{
        bits::pack_subframe,
        subframe::{decode, IonoUtcPage, Subframe, Subframe1, Subframe2, Subframe3},
        NavigationMessage, NavigationMessageFrame, UtcParameters,
    },
    prelude::{PrnArray, SatelliteId},
};

/// Subframes gathered for one satellite
#[derive(Debug, Default, Clone, PartialEq)]
struct PendingEphemeris {
    sf1: Option<Subframe1>,
    sf2: Option<Subframe2>,
    sf3: Option<Subframe3>,
}

impl PendingEphemeris {
    /// Assembles the [Ephemeris] once all three subframes share the same issue of data
    fn complete(&self, id: SatelliteId) -> Option<Ephemeris> {
        let (sf1, sf2, sf3) = (self.sf1?, self.sf2?, self.sf3?);

        if sf2.iode != sf3.iode || sf2.iode != sf1.iodc & 0xff {
            debug!(
                "{} - issue of data mismatch (iodc={} iode2={} iode3={})",
                id, sf1.iodc, sf2.iode, sf3.iode
            );
            return None;
        }

        Some(Ephemeris {
            sv: id.sv(),
            week: sf1.week,
            toe_s: sf2.toe,
            toc_s: sf1.toc,
            sqrt_a: sf2.sqrt_a,
            e: sf2.e,
            m0: sf2.m0,
            dn: sf2.dn,
            i0: sf3.i0,
            idot: sf3.idot,
            omega0: sf3.omega0,
            omega: sf3.omega,
            omega_dot: sf3.omega_dot,
            cuc: sf2.cuc,
            cus: sf2.cus,
            crc: sf3.crc,
            crs: sf2.crs,
            cic: sf3.cic,
            cis: sf3.cis,
            af0: sf1.af0,
            af1: sf1.af1,
            af2: sf1.af2,
            tgd: sf1.tgd,
            iode: sf2.iode,
            iodc: sf1.iodc,
            health: sf1.health,
            fit_interval_h: if sf2.fit_flag { 6.0 } else { 4.0 },
        })
    }
}

/// [NavigationMessageStore] accumulates the navigation frames decoded
/// by the receiver, until complete ephemerides are obtained.
/// It exposes a single [NavigationMessage] snapshot, replaced
/// on every new complete ephemeris (or ionosphere update).
#[derive(Debug, Clone, Default)]
pub struct NavigationMessageStore {
    pending: PrnArray<Option<PendingEphemeris>>,
    iono: Option<KbModel>,
    utc: Option<UtcParameters>,
    snapshot: Option<NavigationMessage>,
}

impl NavigationMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest decoded [NavigationMessage], once at least one ephemeris is complete
    pub fn snapshot(&self) -> Option<&NavigationMessage> {
        self.snapshot.as_ref()
    }

    /// Consumes one [NavigationMessageFrame].
    /// Returns true when a new snapshot has been published.
    /// Frames of other signals are ignored.
    pub fn handle_frame(&mut self, frame: &NavigationMessageFrame) -> Result<bool, Error> {
        if !frame.is_gps_l1ca() {
            return Ok(false);
        }

        let id = frame.satellite_id()?;
        let packed = pack_subframe(&frame.data)?;
        let (tow, subframe) = decode(&packed)?;

        debug!("{} - subframe (tow={}s)", id, tow);

        let mut pending = self.pending.get(id).clone().unwrap_or_default();

        match subframe {
            Subframe::Clock(sf1) => pending.sf1 = Some(sf1),
            Subframe::EphemerisFirst(sf2) => pending.sf2 = Some(sf2),
            Subframe::EphemerisSecond(sf3) => pending.sf3 = Some(sf3),
            Subframe::IonoUtc(page) => return Ok(self.update_iono_utc(page)),
            Subframe::Unused(_) => return Ok(false),
        }

        let completed = pending.complete(id);
        self.pending.set(id, Some(pending));

        match completed {
            Some(ephemeris) => Ok(self.publish_ephemeris(id, ephemeris)),
            None => Ok(false),
        }
    }

    fn update_iono_utc(&mut self, page: IonoUtcPage) -> bool {
        let iono = KbModel::new(page.alpha, page.beta);
        let utc = UtcParameters {
            a0: page.a0,
            a1: page.a1,
            tot: page.tot,
            wnt: page.wnt,
            dt_ls: page.dt_ls,
            wn_lsf: page.wn_lsf,
            dn: page.dn,
            dt_lsf: page.dt_lsf,
        };

        if self.iono == Some(iono) && self.utc == Some(utc) {
            return false;
        }

        info!("new ionosphere parameters: {:?}", iono);
        self.iono = Some(iono);
        self.utc = Some(utc);

        match &self.snapshot {
            Some(snapshot) => {
                self.snapshot = Some(snapshot.clone().with_iono(iono).with_utc(utc));
                true
            },
            None => false,
        }
    }

    fn publish_ephemeris(&mut self, id: SatelliteId, ephemeris: Ephemeris) -> bool {
        let mut snapshot = self.snapshot.clone().unwrap_or_default();

        if snapshot.ephemeris(id) == Some(&ephemeris) {
            return false;
        }

        info!("{} - new ephemeris (iode={})", id, ephemeris.iode);
        snapshot.ephemerides.set(id, Some(ephemeris));
        snapshot.iono = self.iono;
        snapshot.utc = self.utc;

        self.snapshot = Some(snapshot);
        true
    }
}

#[cfg(test)]
mod test {
    use super::NavigationMessageStore;
    use crate::{
        navmsg::{
            subframe::encoder::{encode_ephemeris, encode_iono, to_words},
            NavigationMessageFrame, GPS_L1CA_MESSAGE_TYPE,
        },
        prelude::SatelliteId,
        tests::{init_logger, reference_ephemeris},
    };

    fn frame(prn: u8, packed: &[u8], submessage_id: u8) -> NavigationMessageFrame {
        NavigationMessageFrame {
            prn,
            message_type: GPS_L1CA_MESSAGE_TYPE,
            submessage_id,
            data: to_words(packed),
        }
    }

    #[test]
    fn ephemeris_completion() {
        init_logger();
        let mut store = NavigationMessageStore::new();
        let eph = reference_ephemeris(8);
        let [sf1, sf2, sf3] = encode_ephemeris(&eph, 345_600);

        assert!(!store.handle_frame(&frame(8, &sf1, 1)).unwrap());
        assert!(!store.handle_frame(&frame(8, &sf2, 2)).unwrap());
        assert!(store.snapshot().is_none());

        assert!(store.handle_frame(&frame(8, &sf3, 3)).unwrap());
        let snapshot = store.snapshot().unwrap();
        let decoded = snapshot.ephemeris(SatelliteId::new(8).unwrap()).unwrap();
        assert_eq!(decoded.iode, eph.iode);
        assert_eq!(decoded.sv, eph.sv);
        assert!((decoded.sqrt_a - eph.sqrt_a).abs() < 1.0E-5);
        assert!(snapshot.iono.is_none());

        // same data again: nothing new
        assert!(!store.handle_frame(&frame(8, &sf3, 3)).unwrap());

        // ionosphere page updates the snapshot
        let alpha = [1.1176E-8, 7.4506E-9, -5.9605E-8, -5.9605E-8];
        let beta = [90112.0, 0.0, -196608.0, -65536.0];
        let sf4 = encode_iono(alpha, beta, 345_618);
        assert!(store.handle_frame(&frame(8, &sf4, 4)).unwrap());
        assert!(store.snapshot().unwrap().iono.is_some());
        assert_eq!(store.snapshot().unwrap().utc.unwrap().dt_ls, 18);
    }

    #[test]
    fn issue_of_data_mismatch() {
        let mut store = NavigationMessageStore::new();
        let eph = reference_ephemeris(9);
        let mut newer = eph;
        newer.iode += 1;
        newer.iodc += 1;

        let [sf1, sf2, _] = encode_ephemeris(&eph, 345_600);
        let [_, _, sf3] = encode_ephemeris(&newer, 345_600);

        store.handle_frame(&frame(9, &sf1, 1)).unwrap();
        store.handle_frame(&frame(9, &sf2, 2)).unwrap();
        assert!(!store.handle_frame(&frame(9, &sf3, 3)).unwrap());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn invalid_frames() {
        let mut store = NavigationMessageStore::new();
        let mut bad = frame(3, &[0; 38], 1);
        bad.data.truncate(12);
        assert!(store.handle_frame(&bad).is_err());

        bad.prn = 0;
        assert!(store.handle_frame(&bad).is_err());

        // other signals are ignored
        bad.message_type = 0x0601;
        assert!(!store.handle_frame(&bad).unwrap());
    }
}
