use thiserror::Error;

use crate::prelude::SV;

/// Failure to obtain the navigation message from the assistance server.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssistanceError {
    /// Server could not be reached or answered with an error.
    #[error("network error: {0}")]
    Network(String),

    /// Server answered but the payload could not be decoded.
    #[error("invalid assistance payload: {0}")]
    Parsing(String),

    /// Fetch did not complete within the configured bound.
    #[error("assistance fetch timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Fewer than 4 usable satellites in this epoch.
    /// This is not fatal: the epoch is reported with a NaN solution.
    #[error("not enough usable satellites ({0})")]
    InsufficientSatellites(usize),

    /// Kepler's equation did not converge within the iteration cap.
    /// Only the satellite being evaluated is dropped.
    #[error("{0}: eccentric anomaly did not converge")]
    KeplerConvergence(SV),

    /// Satellite clock correction (time of transmission) did not converge.
    #[error("{0}: clock correction did not converge")]
    ClockConvergence(SV),

    /// Position refinement exceeded the maximal number of Gauss-Newton iterations.
    /// The whole epoch is abandoned.
    #[error("least squares did not converge after {0} iterations")]
    WlsConvergence(usize),

    /// Ephemeris or ionosphere parameters missing for this satellite.
    #[error("{0}: incomplete navigation message")]
    IncompleteNavigationMessage(SV),

    /// No navigation message could be obtained from any source this epoch.
    #[error("assistance data: {0}")]
    AssistanceFetch(AssistanceError),

    /// Epoch computation needs a reference location to seed the estimator.
    #[error("missing reference location")]
    MissingReferenceLocation,

    /// Epoch computation needs the GPS week number
    #[error("cannot determine gps week")]
    UnknownWeek,

    #[error("failed to invert matrix")]
    MatrixInversion,

    /// PRN outside of the GPS range [1; 32]
    #[error("invalid satellite identifier {0}")]
    InvalidSatellite(u8),

    /// Navigation message frame with unexpected layout
    #[error("invalid navigation message frame: {0}")]
    InvalidFrame(&'static str),

    /// GPS time cannot be negative
    #[error("bad operation: negative time")]
    TimeUnderflow,
}

impl From<AssistanceError> for Error {
    fn from(e: AssistanceError) -> Self {
        Self::AssistanceFetch(e)
    }
}
