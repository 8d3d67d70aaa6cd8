use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the processor is gone.
    ///
    /// Used after a committed mutation: the change is durable either way.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping facility change event: {}", e);
        }
    }
}

/// Changes callers announce once a mutation has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    FacilityCreated(i64),
    FacilityUpdated { facility_id: i64, field: String },
}

impl Event {
    pub fn facility_id(&self) -> i64 {
        match self {
            Event::FacilityCreated(id) => *id,
            Event::FacilityUpdated { facility_id, .. } => *facility_id,
        }
    }
}

/// Outbound push of facility changes (e.g. to subscribers of a site).
#[async_trait]
pub trait FacilityChangeNotifier: Send + Sync {
    async fn notify_facility_changed(&self, facility_id: i64) -> Result<(), ServiceError>;
}

/// Notifier that only logs; the default when no push channel is configured.
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

#[async_trait]
impl FacilityChangeNotifier for LoggingNotifier {
    async fn notify_facility_changed(&self, facility_id: i64) -> Result<(), ServiceError> {
        info!(facility_id, "Facility changed");
        Ok(())
    }
}

/// Creates the event channel used between callers and [`process_events`].
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    notifier: Arc<dyn FacilityChangeNotifier>,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        let facility_id = event.facility_id();
        match &event {
            Event::FacilityCreated(_) => {
                metrics::counter!("facility.events.created", 1);
            }
            Event::FacilityUpdated { field, .. } => {
                metrics::counter!("facility.events.updated", 1);
                tracing::debug!(facility_id, field = %field, "Facility field changed");
            }
        }

        if let Err(e) = notifier.notify_facility_changed(facility_id).await {
            error!(
                "Failed to notify facility change: facility_id={}, error={}",
                facility_id, e
            );
        }
    }

    warn!("Event processing loop has ended");
}
