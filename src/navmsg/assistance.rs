use std::{
    sync::{mpsc, Arc},
    thread,
};

use log::{debug, warn};

use crate::{
    coords::GeodeticPosition,
    error::AssistanceError,
    navmsg::NavigationMessage,
    prelude::{Duration, GpsTime},
};

/// [AssistanceSource] provides a complete [NavigationMessage]
/// from an external service, usually an assistance (SUPL like) server.
/// It is consulted when the receiver has not decoded the navigation
/// message of every satellite in sight.
pub trait AssistanceSource: Send + Sync {
    /// Fetches the [NavigationMessage] valid around `reference`.
    /// `t` is the epoch being resolved, when known.
    fn fetch(
        &self,
        reference: &GeodeticPosition,
        t: Option<GpsTime>,
    ) -> Result<NavigationMessage, AssistanceError>;
}

/// Runs [AssistanceSource::fetch] on a helper thread and waits
/// at most `timeout` for the answer. A late answer is discarded.
pub fn fetch_with_timeout(
    source: Arc<dyn AssistanceSource>,
    reference: GeodeticPosition,
    t: Option<GpsTime>,
    timeout: Duration,
) -> Result<NavigationMessage, AssistanceError> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("assistance".to_string())
        .spawn(move || {
            let result = source.fetch(&reference, t);
            // receiver may have given up already
            let _ = tx.send(result);
        })
        .map_err(|e| AssistanceError::Network(e.to_string()))?;

    let timeout_s = timeout.to_seconds().max(0.0);

    match rx.recv_timeout(std::time::Duration::from_secs_f64(timeout_s)) {
        Ok(Ok(message)) => {
            debug!("assistance: received {} ephemerides", message.len());
            Ok(message)
        },
        Ok(Err(e)) => {
            warn!("assistance: {}", e);
            Err(e)
        },
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("assistance: no answer within {}", timeout);
            Err(AssistanceError::Timeout)
        },
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(AssistanceError::Network(
            "assistance thread terminated".to_string(),
        )),
    }
}
