#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod bias;
mod cfg;
mod constants;
mod coords;
mod ephemeris;
mod error;
mod math;
mod measurement;
mod navigation;
mod navmsg;
mod processor;
mod residuals;
mod smoothing;
mod sv;
mod time;
mod worker;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::bias::{KbModel, TroposphereModel};
    pub use crate::cfg::{Config, Error as ConfigError, Modeling};
    pub use crate::constants::{L1_FREQUENCY_HZ, SPEED_OF_LIGHT_M_S};
    pub use crate::coords::{
        ecef_to_enu, ecef_to_geodetic, ecef_to_geodetic_iterative, enu_rotation, enu_to_ecef,
        geodetic_to_ecef, topocentric, GeodeticPosition, Position, Topocentric,
    };
    pub use crate::ephemeris::{eccentric_anomaly, ClockCorrection, Ephemeris, SatelliteState};
    pub use crate::error::{AssistanceError, Error};
    pub use crate::math::{meters_to_seconds, week_crossover};
    pub use crate::measurement::{
        pseudorange_uncertainty_m, ClockMeasurement, Measurement, MeasurementBatch,
        PseudorangeWithUncertainty, ReconstructedEpoch, ADR_STATE_CYCLE_SLIP, ADR_STATE_RESET,
        ADR_STATE_VALID, STATE_TOW_DECODED,
    };
    pub use crate::navigation::{
        DilutionOfPrecision, EpochSolution, EstimatorState, PositionVelocitySolution,
        SatelliteContribution,
    };
    pub use crate::navmsg::{
        fetch_with_timeout, AssistanceSource, NavigationMessage, NavigationMessageFrame,
        NavigationMessageStore, UtcParameters, GPS_L1CA_MESSAGE_TYPE,
    };
    pub use crate::processor::{EpochProcessor, EpochReport, NavigationSource};
    pub use crate::residuals::{
        correct_residuals, CorrectedResiduals, GroundTruth, SatelliteResidual,
    };
    pub use crate::smoothing::{HatchFilter, NoSmoothing, PseudorangeSmoother, SmoothingStrategy};
    pub use crate::sv::{PrnArray, SatelliteId, GPS_MAX_PRN};
    pub use crate::time::GpsTime;
    pub use crate::worker::{Event, Worker};
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use error::Error;
