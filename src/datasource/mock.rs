//! Mock event source for tests and local development.

use async_trait::async_trait;

use crate::domain::{Event, EventKey};

use super::{EventSource, EventSourceError};

/// Serves a fixed, pre-ordered script of events.
#[derive(Debug, Default)]
pub struct MockEventSource {
    events: Vec<Event>,
}

impl MockEventSource {
    pub fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|event| event.key());
        Self { events }
    }
}

#[async_trait]
impl EventSource for MockEventSource {
    async fn fetch_events(
        &self,
        after: Option<EventKey>,
        limit: usize,
    ) -> Result<Vec<Event>, EventSourceError> {
        let events = self
            .events
            .iter()
            .filter(|event| after.map_or(true, |after| event.key() > after))
            .take(limit)
            .cloned()
            .collect();
        Ok(events)
    }
}
