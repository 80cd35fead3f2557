//! Event feed abstraction.
//!
//! The engine assumes exactly-once, ordered delivery of finalized events;
//! everything about how they are obtained lives behind this trait. The
//! HTTP implementation pulls from an external feed with retry/backoff; the
//! mock serves a fixed script for tests.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::domain::{Event, EventKey};

pub mod http;
pub mod mock;

pub use http::HttpEventSource;
pub use mock::MockEventSource;

/// Source of finalized protocol events.
///
/// Implementations must return events in strictly increasing
/// (block, tx index, log index) order, starting after `after`.
#[async_trait]
pub trait EventSource: Send + Sync + fmt::Debug {
    /// Fetch up to `limit` finalized events after the given cursor.
    ///
    /// An empty result means the source is drained for now.
    async fn fetch_events(
        &self,
        after: Option<EventKey>,
        limit: usize,
    ) -> Result<Vec<Event>, EventSourceError>;
}

/// Error type for event source operations.
#[derive(Debug, Clone, Error)]
pub enum EventSourceError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("rate limited")]
    RateLimited,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EventSourceError::Network("connection timeout".to_string());
        assert_eq!(err.to_string(), "network error: connection timeout");

        let err = EventSourceError::Http {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "http error 503: unavailable");
    }
}
