//! Pseudorange smoothing strategies
use std::collections::HashMap;

use log::debug;

use crate::{
    cfg::Error as ConfigError,
    constants::SPEED_OF_LIGHT_M_S,
    math::week_crossover,
    measurement::{ClockMeasurement, ReconstructedEpoch},
    prelude::SatelliteId,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default Hatch filter window length, in epochs
const DEFAULT_HATCH_WINDOW: usize = 100;

/// [PseudorangeSmoother] is invoked once per epoch, right after
/// pseudorange reconstruction, and may refine each pseudorange
/// using the previous epochs.
/// The reconstructed pseudoranges share an offset that is redefined every epoch,
/// `clock` is the receiver clock the epoch was captured with.
pub trait PseudorangeSmoother: Send {
    /// Returns the smoothed epoch
    fn smooth(&mut self, clock: &ClockMeasurement, epoch: ReconstructedEpoch)
        -> ReconstructedEpoch;
}

/// Default [PseudorangeSmoother]: pass through
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSmoothing;

impl PseudorangeSmoother for NoSmoothing {
    fn smooth(&mut self, _: &ClockMeasurement, epoch: ReconstructedEpoch) -> ReconstructedEpoch {
        epoch
    }
}

/// Smoothing strategy selection
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SmoothingStrategy {
    /// Raw pseudoranges are used
    #[default]
    None,
    /// Carrier aided (Hatch) moving average over `window` epochs
    Hatch { window: usize },
}

impl std::str::FromStr for SmoothingStrategy {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c = s.trim().to_lowercase();
        match c.split_once(':') {
            None if c == "none" => Ok(Self::None),
            None if c == "hatch" => Ok(Self::Hatch {
                window: DEFAULT_HATCH_WINDOW,
            }),
            Some(("hatch", window)) => match window.trim().parse::<usize>() {
                Ok(window) if window > 0 => Ok(Self::Hatch { window }),
                _ => Err(ConfigError::InvalidSmoothingWindow(window.to_string())),
            },
            _ => Err(ConfigError::UnknownSmoothingStrategy(s.trim().to_string())),
        }
    }
}

impl SmoothingStrategy {
    /// Builds the [PseudorangeSmoother] implementing this strategy
    pub fn smoother(&self) -> Box<dyn PseudorangeSmoother> {
        match self {
            Self::None => Box::new(NoSmoothing),
            Self::Hatch { window } => Box::new(HatchFilter::new(*window)),
        }
    }
}

#[derive(Debug, Clone)]
struct MovingAverage {
    pub n: usize,
    pub size: usize,
    pub c_n: f64,
    pub l_n: f64,
}

impl MovingAverage {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            n: 0,
            c_n: 0.0,
            l_n: 0.0,
        }
    }

    /// Smooths code range `c_n` with carrier range `l_n`
    pub fn add(&mut self, c_n: f64, l_n: f64) -> f64 {
        self.n += 1;
        let alpha = if self.n < self.size {
            1.0 / self.n as f64
        } else {
            1.0 / self.size as f64
        };

        let c_k = if self.n == 1 {
            c_n
        } else {
            let l_k = l_n - self.l_n;
            alpha * c_n + (1.0 - alpha) * (self.c_n + l_k)
        };

        self.l_n = l_n;
        self.c_n = c_k;
        c_k
    }

    /// Moves the smoothed range along with the reference it is expressed in
    pub fn rebase(&mut self, offset_m: f64) {
        self.c_n -= offset_m;
    }
}

/// Hatch filter: code pseudoranges are averaged over a sliding window,
/// propagated by the accumulated delta range. A satellite whose delta range
/// is invalid or discontinuous restarts its filter.
/// Averages are kept consistent with the common reception time of each epoch,
/// using the time elapsed on the receiver clock: every filter restarts
/// when that clock does not move forward.
#[derive(Debug, Clone)]
pub struct HatchFilter {
    window: usize,
    /// Receiver clock (ns) and reception time of week (s) of the previous epoch
    last_epoch: Option<(i64, f64)>,
    inner: HashMap<SatelliteId, MovingAverage>,
}

impl HatchFilter {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            last_epoch: None,
            inner: HashMap::with_capacity(16),
        }
    }

    /// Change of the common offset (m) since previous epoch,
    /// None when it cannot be determined.
    fn offset_change_m(&mut self, clock: &ClockMeasurement, rx_tow_s: f64) -> Option<f64> {
        let (time_nanos, last_rx_tow_s) = self.last_epoch.replace((clock.time_nanos, rx_tow_s))?;
        let elapsed_s = (clock.time_nanos - time_nanos) as f64 * 1.0E-9;
        if elapsed_s <= 0.0 {
            return None;
        }
        let rx_elapsed_s = week_crossover(rx_tow_s - last_rx_tow_s);
        Some((elapsed_s - rx_elapsed_s) * SPEED_OF_LIGHT_M_S)
    }
}

impl PseudorangeSmoother for HatchFilter {
    fn smooth(
        &mut self,
        clock: &ClockMeasurement,
        mut epoch: ReconstructedEpoch,
    ) -> ReconstructedEpoch {
        match self.offset_change_m(clock, epoch.rx_tow_s) {
            Some(offset_m) => {
                for avg in self.inner.values_mut() {
                    avg.rebase(offset_m);
                }
            },
            None => {
                if !self.inner.is_empty() {
                    debug!("receiver clock did not move forward: hatch filters reset");
                    self.inner.clear();
                }
            },
        }

        // satellites no longer tracked restart from scratch
        self.inner
            .retain(|id, _| epoch.pseudoranges.iter().any(|pr| pr.id == *id));

        let window = self.window;

        for pr in epoch.pseudoranges.iter_mut() {
            if !pr.measurement.adr_continuous() {
                if self.inner.remove(&pr.id).is_some() {
                    debug!("{} - hatch filter reset", pr.id);
                }
                continue;
            }

            let avg = self
                .inner
                .entry(pr.id)
                .or_insert_with(|| MovingAverage::new(window));

            pr.pseudorange_m = avg.add(pr.pseudorange_m, pr.measurement.accumulated_delta_range_m);
        }

        epoch
    }
}
