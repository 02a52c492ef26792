//! Core aggregate and domain event traits.

use audit_log::{RegistryId, Version};
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded in the audit log.
///
/// Events are immutable and named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced aggregate.
///
/// Aggregates are rebuilt by replaying events, decide on new events from
/// commands without mutating themselves, and change state only in
/// [`Aggregate::apply`].
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;
    type Error: std::error::Error + Send + Sync;

    /// Aggregate type name, used to tag audit records.
    fn aggregate_type() -> &'static str;

    /// Returns `None` until the creating event has been applied.
    fn id(&self) -> Option<RegistryId>;

    /// Version of the last applied event, 0 for a fresh aggregate.
    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Applies an event.
    ///
    /// Must be deterministic and must not fail: the event has already
    /// happened.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Aggregates whose whole state can be captured in a snapshot.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Returns whether moving from `previous` to the current version crossed
    /// a multiple of `interval`. A batch of several events can step over the
    /// multiple itself. An interval of 0 disables snapshots.
    fn should_snapshot(&self, previous: Version, interval: u64) -> bool {
        let current = self.version().as_i64().max(0) as u64;
        let previous = previous.as_i64().max(0) as u64;
        interval > 0 && current > previous && current / interval != previous / interval
    }
}
