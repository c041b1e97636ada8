//! Serial worker thread
use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

use log::{debug, error, info};

use crate::{
    coords::GeodeticPosition,
    measurement::MeasurementBatch,
    navmsg::NavigationMessageFrame,
    processor::{EpochProcessor, EpochReport},
    residuals::GroundTruth,
};

/// Inputs of the [Worker], processed in order of arrival
#[derive(Debug, Clone)]
pub enum Event {
    /// One measurement epoch, to be resolved
    Measurements(MeasurementBatch),
    /// Navigation message frame decoded by the receiver
    NavigationMessage(NavigationMessageFrame),
    /// Approximate receiver location
    ReferenceLocation(GeodeticPosition),
    /// Ground truth, None to disable the residual correction
    GroundTruth(Option<GroundTruth>),
    /// Terminates the worker
    Shutdown,
}

/// [Worker] runs one [EpochProcessor] on a dedicated thread.
/// Events are marshalled through a channel, so processor state is
/// only ever touched by that thread.
pub struct Worker {
    events: Sender<Event>,
    handle: Option<JoinHandle<EpochProcessor>>,
}

impl Worker {
    /// Spawns the worker thread. One [EpochReport] is emitted per
    /// [Event::Measurements], on the returned [Receiver].
    pub fn spawn(processor: EpochProcessor) -> std::io::Result<(Self, Receiver<EpochReport>)> {
        let (events, rx) = mpsc::channel::<Event>();
        let (reports, reports_rx) = mpsc::channel::<EpochReport>();

        let handle = thread::Builder::new()
            .name("gnss-pvt".to_string())
            .spawn(move || run(processor, rx, reports))?;

        Ok((
            Self {
                events,
                handle: Some(handle),
            },
            reports_rx,
        ))
    }

    /// Posts an [Event]. Returns false when the worker has terminated.
    pub fn send(&self, event: Event) -> bool {
        self.events.send(event).is_ok()
    }

    /// Cloneable handle that other threads may post [Event]s with
    pub fn sender(&self) -> Sender<Event> {
        self.events.clone()
    }

    /// Stops the worker once pending events are processed,
    /// returning the [EpochProcessor] in its final state.
    pub fn shutdown(mut self) -> Option<EpochProcessor> {
        let _ = self.events.send(Event::Shutdown);
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.events.send(Event::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run(
    mut processor: EpochProcessor,
    events: Receiver<Event>,
    reports: Sender<EpochReport>,
) -> EpochProcessor {
    info!("worker started");

    while let Ok(event) = events.recv() {
        match event {
            Event::Measurements(batch) => {
                let report = processor.process(&batch);
                if reports.send(report).is_err() {
                    debug!("report receiver dropped");
                }
            },
            Event::NavigationMessage(frame) => {
                if let Err(e) = processor.handle_navigation_frame(&frame) {
                    error!("navigation frame (prn={}): {}", frame.prn, e);
                }
            },
            Event::ReferenceLocation(reference) => processor.set_reference_location(reference),
            Event::GroundTruth(truth) => processor.set_ground_truth(truth),
            Event::Shutdown => break,
        }
    }

    info!("worker terminated");
    processor
}
