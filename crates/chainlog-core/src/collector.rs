//! Draining the event source into one batch.

use chainlog_contracts::event::Event;

use crate::traits::EventSource;

/// Take every available event from `source`, in arrival order.
///
/// No reordering and no deduplication. Returns an empty batch when the
/// source has nothing, even if it previously reported pending events.
pub fn drain(source: &dyn EventSource) -> Vec<Event> {
    let mut batch = Vec::new();
    while let Some(event) = source.take() {
        batch.push(event);
    }
    batch
}
