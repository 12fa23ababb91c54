//! Event types for the dashboard event system
//!
//! Views subscribe to the EventBus and re-render when the state store reports
//! a change. The store is the only emitter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::api::AttendanceStatus;

/// Dashboard event types
///
/// Events can be serialized for logging or forwarding to another front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    /// Roster replaced wholesale by a reload
    ///
    /// Triggers: roster table, class filter options, selection widgets
    RosterReplaced {
        /// Reload generation that produced this roster
        generation: u64,
        /// Number of students in the new roster
        count: usize,
    },

    /// A roster reload response arrived after a newer one was applied and
    /// was dropped (only under the `latest_issued` reload policy)
    StaleRosterDiscarded { generation: u64, applied: u64 },

    /// Confirmed status change for one or more students
    ///
    /// Triggers: whichever view is active
    AttendanceChanged {
        date: NaiveDate,
        student_ids: Vec<i64>,
        status: AttendanceStatus,
    },

    /// Status map rebuilt from the server for a (possibly new) date
    AttendanceReloaded { date: NaiveDate, marked: usize },

    /// Filter inputs changed
    FilterChanged { shown: usize, total: usize },

    /// Row selection cleared after a bulk operation
    SelectionCleared,

    /// Summary statistics refreshed
    SummaryRefreshed,

    /// Session ended (token cleared); the front end should show login
    LoggedOut,
}

/// Broadcast bus for dashboard events
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use rollcall_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(64);
    /// assert_eq!(event_bus.capacity(), 64);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// The terminal front end renders on demand and never subscribes, so a
    /// missing listener is normal.
    pub fn emit_lossy(&self, event: DashboardEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit_lossy(DashboardEvent::SelectionCleared);

        assert_eq!(rx.recv().await.unwrap(), DashboardEvent::SelectionCleared);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.emit_lossy(DashboardEvent::SummaryRefreshed);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = DashboardEvent::RosterReplaced {
            generation: 3,
            count: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RosterReplaced");
        assert_eq!(json["count"], 2);
    }
}
