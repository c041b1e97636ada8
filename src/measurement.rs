//! Raw GNSS measurements and pseudorange reconstruction
use itertools::Itertools;
use log::debug;

use crate::{
    constants::{AVERAGE_TRAVEL_TIME_S, SPEED_OF_LIGHT_M_S},
    math::week_crossover,
    prelude::{Constellation, GpsTime, SatelliteId, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Measurement state bit: time of week has been decoded
pub const STATE_TOW_DECODED: u32 = 1 << 3;

/// Accumulated delta range state bit: measurement is valid
pub const ADR_STATE_VALID: u32 = 1;

/// Accumulated delta range state bit: tracking loop was reset
pub const ADR_STATE_RESET: u32 = 1 << 1;

/// Accumulated delta range state bit: cycle slip detected
pub const ADR_STATE_CYCLE_SLIP: u32 = 1 << 2;

/// C/A code chip duration (s)
const CHIP_DURATION_S: f64 = 1.0 / 1.023E6;

/// Early / late correlator spacing, in chips
const DLL_CORRELATOR_SPACING: f64 = 0.1;

/// Code integration time (s)
const CODE_INTEGRATION_TIME_S: f64 = 0.02;

/// One satellite signal [Measurement], captured at a receiver epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// [SV]
    pub sv: SV,
    /// Tracking state bitmask (see [STATE_TOW_DECODED])
    pub state: u32,
    /// Received satellite time, in nanoseconds of week once the time of week is decoded
    pub received_sv_time_nanos: i64,
    /// Measurement time offset to the clock time (ns)
    pub time_offset_nanos: f64,
    /// Carrier to noise density (dB.Hz)
    pub cn0_dbhz: f64,
    /// Accumulated delta range (m)
    pub accumulated_delta_range_m: f64,
    /// Accumulated delta range uncertainty (m)
    pub accumulated_delta_range_uncertainty_m: f64,
    /// Accumulated delta range state bitmask (see [ADR_STATE_VALID])
    pub adr_state: u32,
    /// Pseudorange rate (m/s)
    pub pseudorange_rate_mps: f64,
    /// Pseudorange rate uncertainty (m/s)
    pub pseudorange_rate_uncertainty_mps: f64,
}

impl Measurement {
    /// Builds a new [Measurement] with decoded time of week
    pub fn new(sv: SV, received_sv_time_nanos: i64, cn0_dbhz: f64) -> Self {
        Self {
            sv,
            cn0_dbhz,
            received_sv_time_nanos,
            state: STATE_TOW_DECODED,
            ..Default::default()
        }
    }

    /// Copies and returns [Measurement] with pseudorange rate and its uncertainty
    pub fn with_pseudorange_rate(mut self, rate_mps: f64, uncertainty_mps: f64) -> Self {
        self.pseudorange_rate_mps = rate_mps;
        self.pseudorange_rate_uncertainty_mps = uncertainty_mps;
        self
    }

    /// Copies and returns [Measurement] with accumulated delta range
    pub fn with_accumulated_delta_range(mut self, adr_m: f64, adr_state: u32) -> Self {
        self.accumulated_delta_range_m = adr_m;
        self.adr_state = adr_state;
        self
    }

    /// Returns true when the time of week has been decoded
    pub fn tow_decoded(&self) -> bool {
        self.state & STATE_TOW_DECODED > 0
    }

    /// Returns true when the accumulated delta range may be used
    /// to propagate a smoothed pseudorange.
    pub fn adr_continuous(&self) -> bool {
        self.adr_state & ADR_STATE_VALID > 0
            && self.adr_state & (ADR_STATE_RESET | ADR_STATE_CYCLE_SLIP) == 0
    }

    /// Returns validated [SatelliteId] for GPS measurements
    pub fn satellite_id(&self) -> Option<SatelliteId> {
        if self.sv.constellation == Constellation::GPS {
            SatelliteId::new(self.sv.prn).ok()
        } else {
            None
        }
    }

    /// Time of week of transmission, in satellite time (ns),
    /// aligned on the clock reference time.
    fn tow_nanos(&self) -> f64 {
        self.received_sv_time_nanos as f64 - self.time_offset_nanos
    }
}

/// Receiver clock state at measurement epoch.
/// Optional fields are not reported by every receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClockMeasurement {
    /// Receiver (hardware) clock time (ns)
    pub time_nanos: i64,
    /// Difference between hardware clock and GPS time (ns)
    pub full_bias_nanos: Option<i64>,
    /// Sub-nanosecond part of the bias (ns)
    pub bias_nanos: Option<f64>,
    /// Clock drift (ns/s)
    pub drift_nanos_per_sec: Option<f64>,
    /// Leap second count, when known
    pub leap_second: Option<i32>,
}

impl ClockMeasurement {
    /// Receiver estimate of GPS time, when full bias is known
    pub fn gps_time(&self) -> Option<GpsTime> {
        let full_bias = self.full_bias_nanos?;
        let bias = self.bias_nanos.unwrap_or_default().round() as i64;
        GpsTime::try_from_nanos(self.time_nanos - full_bias - bias).ok()
    }
}

/// All measurements of one receiver epoch
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementBatch {
    /// [ClockMeasurement]
    pub clock: ClockMeasurement,
    /// Per satellite [Measurement]s
    pub measurements: Vec<Measurement>,
}

/// Pseudorange reconstructed from one [Measurement]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PseudorangeWithUncertainty {
    /// [SatelliteId]
    pub id: SatelliteId,
    /// Source [Measurement]
    pub measurement: Measurement,
    /// Pseudorange (m)
    pub pseudorange_m: f64,
    /// Pseudorange standard deviation (m)
    pub uncertainty_m: f64,
}

/// Pseudoranges of one epoch, referenced to a common reception time
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedEpoch {
    /// Reception time of week (s), in receiver time
    pub rx_tow_s: f64,
    /// One pseudorange per usable satellite, in PRN order
    pub pseudoranges: Vec<PseudorangeWithUncertainty>,
}

/// Pseudorange standard deviation (m) of a DLL tracking loop, at given C/N0.
pub fn pseudorange_uncertainty_m(cn0_dbhz: f64) -> f64 {
    let snr_linear = 10.0_f64.powf(cn0_dbhz / 10.0);
    SPEED_OF_LIGHT_M_S
        * CHIP_DURATION_S
        * (DLL_CORRELATOR_SPACING / (4.0 * CODE_INTEGRATION_TIME_S * snr_linear)).sqrt()
}

impl MeasurementBatch {
    /// GPS measurements that may contribute to a solution: valid PRN,
    /// decoded time of week and C/N0 above `min_cn0_dbhz`.
    /// When one satellite is reported twice, the strongest signal is retained.
    pub fn usable(&self, min_cn0_dbhz: f64) -> Vec<(SatelliteId, Measurement)> {
        self.measurements
            .iter()
            .filter_map(|m| {
                let id = m.satellite_id()?;
                if !m.tow_decoded() {
                    debug!("{} - time of week not decoded", m.sv);
                    return None;
                }
                if m.cn0_dbhz < min_cn0_dbhz {
                    debug!("{} - rejected: c/n0 {:.1}dB.Hz", m.sv, m.cn0_dbhz);
                    return None;
                }
                Some((id, *m))
            })
            .sorted_by(|(a, ma), (b, mb)| a.cmp(b).then(mb.cn0_dbhz.total_cmp(&ma.cn0_dbhz)))
            .dedup_by(|(a, _), (b, _)| a == b)
            .collect()
    }

    /// Reception time of this epoch, given its reception time of week (s).
    /// The week is picked so the returned instant lies the closest to the
    /// receiver clock, when it reports its full bias, or to `fallback` otherwise.
    /// The time of week may exceed one week, when the satellites were last
    /// seen transmitting at the end of previous week.
    pub fn reception_time(&self, rx_tow_s: f64, fallback: Option<GpsTime>) -> Option<GpsTime> {
        let reference = self.clock.gps_time().or(fallback)?;
        reference.nearest_tow(rx_tow_s).ok()
    }

    /// Reconstructs pseudoranges with the common reception time method:
    /// every satellite is referenced to the latest transmission time of the epoch,
    /// received after the average travel time. The resulting common offset
    /// is absorbed by the receiver clock bias.
    /// Returns None when no measurement is usable.
    pub fn reconstruct(&self, min_cn0_dbhz: f64) -> Option<ReconstructedEpoch> {
        let usable = self.usable(min_cn0_dbhz);

        // latest transmission, one satellite may already have crossed into next week
        let max_tow_nanos = usable
            .iter()
            .map(|(_, m)| m.tow_nanos())
            .max_by(|a, b| week_crossover((a - b) * 1.0E-9).total_cmp(&0.0))?;

        let pseudoranges = usable
            .into_iter()
            .map(|(id, measurement)| {
                let dt_s = week_crossover((max_tow_nanos - measurement.tow_nanos()) * 1.0E-9);
                PseudorangeWithUncertainty {
                    id,
                    measurement,
                    pseudorange_m: (AVERAGE_TRAVEL_TIME_S + dt_s) * SPEED_OF_LIGHT_M_S,
                    uncertainty_m: pseudorange_uncertainty_m(measurement.cn0_dbhz),
                }
            })
            .collect();

        Some(ReconstructedEpoch {
            rx_tow_s: max_tow_nanos * 1.0E-9 + AVERAGE_TRAVEL_TIME_S,
            pseudoranges,
        })
    }
}
