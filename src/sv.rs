//! Satellite identification
use crate::{
    error::Error,
    prelude::{Constellation, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of GPS satellite slots (PRN 1 to 32)
pub const GPS_MAX_PRN: usize = 32;

/// Validated GPS satellite identifier, PRN in [1; 32].
/// Use [SatelliteId::index] to address per satellite tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteId(u8);

impl SatelliteId {
    /// Builds a [SatelliteId] from a GPS PRN number
    pub fn new(prn: u8) -> Result<Self, Error> {
        if prn == 0 || prn as usize > GPS_MAX_PRN {
            Err(Error::InvalidSatellite(prn))
        } else {
            Ok(Self(prn))
        }
    }

    /// PRN number
    pub fn prn(&self) -> u8 {
        self.0
    }

    /// Zero based table index
    pub fn index(&self) -> usize {
        self.0 as usize - 1
    }

    /// Iterates all valid identifiers
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=GPS_MAX_PRN as u8).map(Self)
    }

    /// Converts to generic [SV]
    pub fn sv(&self) -> SV {
        SV::new(Constellation::GPS, self.0)
    }
}

impl TryFrom<SV> for SatelliteId {
    type Error = Error;
    fn try_from(sv: SV) -> Result<Self, Error> {
        if sv.constellation != Constellation::GPS {
            return Err(Error::InvalidSatellite(sv.prn));
        }
        Self::new(sv.prn)
    }
}

impl std::fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "G{:02}", self.0)
    }
}

/// Fixed size table holding one value per GPS satellite slot
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrnArray<T> {
    #[cfg_attr(
        feature = "serde",
        serde(
            deserialize_with = "deserialize_slots",
            bound(deserialize = "T: Deserialize<'de>")
        )
    )]
    inner: Vec<T>,
}

/// Rejects tables that do not hold exactly one slot per PRN
#[cfg(feature = "serde")]
fn deserialize_slots<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let slots = Vec::<T>::deserialize(deserializer)?;
    if slots.len() != GPS_MAX_PRN {
        return Err(serde::de::Error::invalid_length(
            slots.len(),
            &"one slot per gps prn",
        ));
    }
    Ok(slots)
}

impl<T: Clone> PrnArray<T> {
    /// Builds a table where every slot holds `value`
    pub fn filled(value: T) -> Self {
        Self {
            inner: vec![value; GPS_MAX_PRN],
        }
    }
}

impl<T> PrnArray<T> {
    pub fn get(&self, id: SatelliteId) -> &T {
        &self.inner[id.index()]
    }

    pub fn set(&mut self, id: SatelliteId, value: T) {
        self.inner[id.index()] = value;
    }

    /// Iterates (identifier, value) pairs in PRN order
    pub fn iter(&self) -> impl Iterator<Item = (SatelliteId, &T)> {
        SatelliteId::all().zip(self.inner.iter())
    }

    /// Raw slice, where slot `i` holds PRN `i + 1`
    pub fn as_slice(&self) -> &[T] {
        &self.inner
    }
}

impl PrnArray<f64> {
    /// Table of NaN (unseen satellites)
    pub fn nan() -> Self {
        Self::filled(f64::NAN)
    }
}

impl<T> PrnArray<Option<T>> {
    /// Number of populated slots
    pub fn count(&self) -> usize {
        self.inner.iter().filter(|v| v.is_some()).count()
    }

    /// Iterates populated slots only
    pub fn populated(&self) -> impl Iterator<Item = (SatelliteId, &T)> {
        self.iter()
            .filter_map(|(id, value)| value.as_ref().map(|value| (id, value)))
    }
}

impl<T> Default for PrnArray<Option<T>> {
    fn default() -> Self {
        Self {
            inner: (0..GPS_MAX_PRN).map(|_| None).collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{PrnArray, SatelliteId, GPS_MAX_PRN};
    use crate::prelude::{Constellation, SV};

    #[test]
    fn satellite_id_range() {
        assert!(SatelliteId::new(0).is_err());
        assert!(SatelliteId::new(33).is_err());
        let id = SatelliteId::new(32).unwrap();
        assert_eq!(id.index(), 31);
        assert_eq!(id.to_string(), "G32");
        assert_eq!(SatelliteId::all().count(), GPS_MAX_PRN);

        let sv = SV::new(Constellation::Galileo, 3);
        assert!(SatelliteId::try_from(sv).is_err());
        let sv = SV::new(Constellation::GPS, 3);
        assert_eq!(SatelliteId::try_from(sv).unwrap().prn(), 3);
    }

    #[test]
    fn prn_array() {
        let mut table = PrnArray::<Option<f64>>::default();
        assert_eq!(table.count(), 0);
        table.set(SatelliteId::new(1).unwrap(), Some(1.0));
        table.set(SatelliteId::new(32).unwrap(), Some(32.0));
        assert_eq!(table.count(), 2);
        let prns = table
            .populated()
            .map(|(id, _)| id.prn())
            .collect::<Vec<_>>();
        assert_eq!(prns, vec![1, 32]);

        let residuals = PrnArray::nan();
        assert!(residuals.as_slice().iter().all(|r: &f64| r.is_nan()));
    }

    #[test]
    #[cfg(feature = "serde")]
    fn prn_array_deserialization() {
        let mut table = PrnArray::<Option<u8>>::default();
        table.set(SatelliteId::new(5).unwrap(), Some(5));

        let content = serde_json::to_string(&table).unwrap();
        let parsed: PrnArray<Option<u8>> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, table);

        // indexing a short table would panic
        assert!(serde_json::from_str::<PrnArray<Option<u8>>>(r#"{"inner":[null,1]}"#).is_err());

        let long = format!("{{\"inner\":[{}]}}", vec!["null"; GPS_MAX_PRN + 1].join(","));
        assert!(serde_json::from_str::<PrnArray<Option<u8>>>(&long).is_err());
    }
}
