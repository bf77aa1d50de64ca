//! Front door for inbound events.

use crate::dedup::DedupCache;
use crate::flow::FlowController;
use picpost_core::event::InboundEvent;
use std::sync::Arc;
use tokio::sync::Mutex;

/// How an inbound event was disposed of. Every variant acknowledges the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    Processed,
    /// Seen recently; dropped without side effects
    Duplicate,
    /// No live session for the event
    Ignored,
    /// Handling failed; the user was told through the notifier
    Failed,
}

/// Deduplicates inbound events and hands them to the flow controller.
///
/// Never reports a failure to the transport, since that would trigger redelivery.
pub struct EventIntake {
    dedup: Mutex<DedupCache>,
    flow: Arc<FlowController>,
}

impl EventIntake {
    pub fn new(flow: Arc<FlowController>, dedup_capacity: usize) -> Self {
        Self {
            dedup: Mutex::new(DedupCache::new(dedup_capacity)),
            flow,
        }
    }

    pub async fn accept(&self, event: InboundEvent) -> Acknowledgement {
        let is_new = self.dedup.lock().await.record(&event.id);
        if !is_new {
            tracing::info!(
                event_id = %event.id,
                session_id = %event.session_id,
                "[EventIntake] duplicate delivery dropped"
            );
            return Acknowledgement::Duplicate;
        }

        match self.flow.handle(&event).await {
            Ok(()) => Acknowledgement::Processed,
            Err(e) if e.is_session_not_found() => {
                tracing::debug!(
                    event_id = %event.id,
                    session_id = %event.session_id,
                    "[EventIntake] no session for event, ignoring"
                );
                Acknowledgement::Ignored
            }
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    session_id = %event.session_id,
                    error = %e,
                    "[EventIntake] event handling failed"
                );
                self.flow.report_failure(&event, &e).await;
                Acknowledgement::Failed
            }
        }
    }
}
