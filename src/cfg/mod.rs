use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use hifitime::Unit;

use crate::{prelude::Duration, smoothing::SmoothingStrategy};

mod modeling;
pub use modeling::Modeling;

/// Configuration Error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("unknown smoothing strategy \"{0}\"")]
    UnknownSmoothingStrategy(String),
    #[error("invalid smoothing window \"{0}\"")]
    InvalidSmoothingWindow(String),
}

fn default_min_cn0() -> f64 {
    18.0
}

fn default_max_iter() -> usize {
    100
}

fn default_convergence() -> f64 {
    1.0E-4
}

fn default_max_residual() -> f64 {
    20.0
}

fn default_atmospheric_threshold() -> f64 {
    1000.0
}

fn default_residual_clock_deviation() -> f64 {
    5.0
}

fn default_assistance_timeout() -> Duration {
    Duration::from_seconds(5.0)
}

fn default_ephemeris_max_age() -> Duration {
    Unit::Hour * 4
}

/// [Config] gathers every tunable of the processing pipeline.
/// Defaults are the values we recommend for smartphone grade
/// GPS L1 C/A measurements.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Signals weaker than this C/N0 (dB.Hz) are not used
    #[cfg_attr(feature = "serde", serde(default = "default_min_cn0"))]
    pub min_cn0_dbhz: f64,

    /// Maximal number of Gauss-Newton iterations, per position resolution
    #[cfg_attr(feature = "serde", serde(default = "default_max_iter"))]
    pub max_iterations: usize,

    /// Position refinement stops once the sum of absolute position
    /// corrections (m) is below this value
    #[cfg_attr(feature = "serde", serde(default = "default_convergence"))]
    pub convergence_m: f64,

    /// Satellites whose post-fit residual magnitude (m) exceeds this value
    /// are removed, while enough satellites remain.
    #[cfg_attr(feature = "serde", serde(default = "default_max_residual"))]
    pub max_residual_m: f64,

    /// Atmospheric delays are only modeled once the previous position
    /// correction (m) dropped below this value.
    /// This is a convergence heuristic, not a physical cutoff.
    #[cfg_attr(feature = "serde", serde(default = "default_atmospheric_threshold"))]
    pub atmospheric_threshold_m: f64,

    /// Ground truth residual correction: satellites deviating by more than this
    /// (m) from the consensus clock bias are discarded from the consensus.
    #[cfg_attr(
        feature = "serde",
        serde(default = "default_residual_clock_deviation")
    )]
    pub residual_clock_deviation_m: f64,

    /// Bound on the external navigation message request
    #[cfg_attr(feature = "serde", serde(default = "default_assistance_timeout"))]
    pub assistance_timeout: Duration,

    /// Ephemerides older (or newer) than this, with respect to
    /// their time of issue, are not used.
    #[cfg_attr(feature = "serde", serde(default = "default_ephemeris_max_age"))]
    pub ephemeris_max_age: Duration,

    /// Pseudorange smoothing
    #[cfg_attr(feature = "serde", serde(default))]
    pub smoothing: SmoothingStrategy,

    /// Physical [Modeling]
    #[cfg_attr(feature = "serde", serde(default))]
    pub modeling: Modeling,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_cn0_dbhz: default_min_cn0(),
            max_iterations: default_max_iter(),
            convergence_m: default_convergence(),
            max_residual_m: default_max_residual(),
            atmospheric_threshold_m: default_atmospheric_threshold(),
            residual_clock_deviation_m: default_residual_clock_deviation(),
            assistance_timeout: default_assistance_timeout(),
            ephemeris_max_age: default_ephemeris_max_age(),
            smoothing: SmoothingStrategy::default(),
            modeling: Modeling::default(),
        }
    }
}

impl Config {
    /// Copies and returns [Config] with desired [Modeling]
    pub fn with_modeling(mut self, modeling: Modeling) -> Self {
        self.modeling = modeling;
        self
    }

    /// Copies and returns [Config] with desired [SmoothingStrategy]
    pub fn with_smoothing(mut self, smoothing: SmoothingStrategy) -> Self {
        self.smoothing = smoothing;
        self
    }
}

#[cfg(test)]
mod test {
    use super::Config;

    #[test]
    fn default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.min_cn0_dbhz, 18.0);
        assert_eq!(cfg.max_iterations, 100);
        assert_eq!(cfg.max_residual_m, 20.0);
        assert_eq!(cfg.assistance_timeout.to_seconds(), 5.0);
        assert!(cfg.modeling.iono_delay);
    }

    #[test]
    #[cfg(feature = "serde")]
    fn partial_config_deserialization() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "max_residual_m": 30.0,
                "modeling": { "iono_delay": false }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.max_residual_m, 30.0);
        assert_eq!(cfg.min_cn0_dbhz, 18.0);
        assert!(!cfg.modeling.iono_delay);
        assert!(cfg.modeling.tropo_delay);
        assert_eq!(cfg.ephemeris_max_age, Config::default().ephemeris_max_age);
    }
}
