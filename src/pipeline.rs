//! Serialized per-aircraft processing.
//!
//! Reports are queued on a channel that exactly one [`FlightProcessor`] drains.
//! Because a single worker owns the dedup cache, the read → decide → write
//! sequence for a notification can never interleave with another report.

use crate::aircraft::{AircraftState, NotifyPolicy};
use crate::dedup::NotificationDedupCache;
use crate::enrichment::EnrichmentService;
use crate::notification::{DispatchError, Notifier};
use crate::receiver::ReceiverLocation;
use crate::thread_manager::SteppableTask;
use crate::types::RawReport;

use thiserror::Error;

/// How long the worker waits for a report before yielding back to its task loop.
const RECEIVE_TIMEOUT: std::time::Duration = std::time::Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Processing queue is closed")]
    QueueClosed,

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Lifecycle of a report, broadcast for observers such as [`EventLogger`].
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Queued { identity: String },
    Processing { identity: String },
    Processed { aircraft: Box<AircraftState>, total: u64 },
    Failed { identity: String, reason: String },
}

/// Producer side of the processing queue. Cheap to clone.
#[derive(Clone)]
pub struct PipelineQueue {
    sender: crossbeam_channel::Sender<RawReport>,
    events: crossbeam_channel::Sender<PipelineEvent>,
}

impl PipelineQueue {
    /// Hands a report to the worker without waiting for it to be processed.
    pub fn enqueue(&self, report: RawReport) -> Result<(), PipelineError> {
        let _ = self.events.send(PipelineEvent::Queued {
            identity: report.identity(),
        });
        self.sender
            .send(report)
            .map_err(|_| PipelineError::QueueClosed)
    }
}

/// Creates the queue. The receiver belongs to the single [`FlightProcessor`].
#[must_use]
pub fn queue(
    events: crossbeam_channel::Sender<PipelineEvent>,
) -> (PipelineQueue, crossbeam_channel::Receiver<RawReport>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (PipelineQueue { sender, events }, receiver)
}

/// Settings the worker needs beyond its collaborators.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorSettings {
    pub policy: NotifyPolicy,
    pub always_check_services: bool,
}

pub struct FlightProcessor {
    reports: crossbeam_channel::Receiver<RawReport>,
    events: crossbeam_channel::Sender<PipelineEvent>,
    receiver_location: ReceiverLocation,
    settings: ProcessorSettings,
    services: Vec<Box<dyn EnrichmentService>>,
    notifier: Box<dyn Notifier>,
    dedup: NotificationDedupCache,
    processed: u64,
}

impl FlightProcessor {
    #[must_use]
    pub fn new(
        reports: crossbeam_channel::Receiver<RawReport>,
        events: crossbeam_channel::Sender<PipelineEvent>,
        receiver_location: ReceiverLocation,
        settings: ProcessorSettings,
        services: Vec<Box<dyn EnrichmentService>>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        FlightProcessor {
            reports,
            events,
            receiver_location,
            settings,
            services,
            notifier,
            dedup: NotificationDedupCache::new(),
            processed: 0,
        }
    }

    #[must_use]
    pub fn processed(&self) -> u64 {
        self.processed
    }

    #[must_use]
    pub fn dedup(&self) -> &NotificationDedupCache {
        &self.dedup
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }

    /// Runs one report through decision, enrichment and dispatch.
    pub fn process(&mut self, report: RawReport) -> Result<AircraftState, PipelineError> {
        let identity = report.identity();
        let last_notified = self.dedup.get(&identity);

        let mut aircraft = AircraftState::from_report(
            report,
            &self.receiver_location,
            last_notified,
            &self.settings.policy,
            chrono::Utc::now(),
        );

        self.emit(PipelineEvent::Processing {
            identity: identity.clone(),
        });

        if aircraft.notify || self.settings.always_check_services {
            self.enrich(&identity, &mut aircraft);
        }

        aircraft.touch();

        if aircraft.notify {
            if self.notifier.notify(&aircraft)? {
                let now = chrono::Utc::now().timestamp();
                aircraft.last_notified = Some(now);
                self.dedup.set(&identity, now);
                log::info!("Notified: {identity}");
            } else {
                log::warn!("Notification for {identity} was not sent");
            }
        }

        self.processed += 1;
        Ok(aircraft)
    }

    fn enrich(&mut self, identity: &str, aircraft: &mut AircraftState) {
        let Some(hex) = aircraft.report.hex.clone() else {
            log::debug!("Skipping enrichment for {identity}: no transponder address");
            return;
        };
        for service in &mut self.services {
            let result = service.check(identity, &hex);
            if let crate::enrichment::EnrichmentResult::Error { error } = &result {
                log::debug!("{} check for {identity} failed: {error}", service.name());
            }
            aircraft.set_service(service.name(), result);
        }
    }
}

impl SteppableTask for FlightProcessor {
    fn step(&mut self) -> bool {
        let report = match self.reports.recv_timeout(RECEIVE_TIMEOUT) {
            Ok(report) => report,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => return true,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                log::info!("FlightProcessor: queue closed, stopping");
                return false;
            }
        };

        let identity = report.identity();
        match self.process(report) {
            Ok(aircraft) => self.emit(PipelineEvent::Processed {
                aircraft: Box::new(aircraft),
                total: self.processed,
            }),
            Err(e) => {
                log::error!("Failed processing {identity}: {e}");
                self.emit(PipelineEvent::Failed {
                    identity,
                    reason: e.to_string(),
                });
            }
        }
        true
    }
}

/// Drains lifecycle events and writes them to the log.
pub struct EventLogger {
    events: crossbeam_channel::Receiver<PipelineEvent>,
}

impl EventLogger {
    #[must_use]
    pub fn new(events: crossbeam_channel::Receiver<PipelineEvent>) -> Self {
        EventLogger { events }
    }
}

impl SteppableTask for EventLogger {
    fn step(&mut self) -> bool {
        let event = match self.events.recv_timeout(RECEIVE_TIMEOUT) {
            Ok(event) => event,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => return true,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return false,
        };

        match event {
            PipelineEvent::Queued { identity } => log::trace!("Queued: {identity}"),
            PipelineEvent::Processing { identity } => log::info!("Processing: {identity}"),
            PipelineEvent::Processed { aircraft, total } => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("{:#}", aircraft.to_json(true));
                }
                log::info!(
                    "Processed: {} (#{total}, notify: {}{})",
                    aircraft.identity(),
                    aircraft.notify,
                    if aircraft.notify_reason.is_empty() {
                        String::new()
                    } else {
                        format!(", {}", aircraft.notify_reason)
                    }
                );
            }
            PipelineEvent::Failed { identity, reason } => {
                log::error!("Dropped {identity}: {reason}");
            }
        }
        true
    }
}
