//! HTTP event feed client.
//!
//! Pulls finalized events from an external feed service as JSON. Transient
//! failures (network, 5xx, rate limiting) are retried with exponential
//! backoff; client errors and malformed payloads are permanent.

use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::domain::{Event, EventKey};

use super::{EventSource, EventSourceError};

#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    base_url: String,
}

impl HttpEventSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get_events(&self, url: String) -> Result<Vec<Event>, EventSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self.client.get(&url).send().await.map_err(|e| {
                backoff::Error::transient(EventSourceError::Network(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(EventSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(EventSourceError::Http {
                    status: status.as_u16(),
                    message: "server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(EventSourceError::Http {
                    status: status.as_u16(),
                    message: "client error".to_string(),
                }));
            }

            response
                .json::<Vec<Event>>()
                .await
                .map_err(|e| backoff::Error::permanent(EventSourceError::Parse(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_events(
        &self,
        after: Option<EventKey>,
        limit: usize,
    ) -> Result<Vec<Event>, EventSourceError> {
        let cursor = after.unwrap_or(EventKey::new(0, 0, 0));
        let url = format!(
            "{}/events?fromBlock={}&fromTxIndex={}&fromLogIndex={}&limit={}",
            self.base_url, cursor.block_number, cursor.tx_index, cursor.log_index, limit
        );
        debug!(%url, "fetching events");

        let mut events = self.get_events(url).await?;
        // The engine only accepts events strictly after the cursor.
        if let Some(after) = after {
            events.retain(|event| event.key() > after);
        }
        events.truncate(limit);
        Ok(events)
    }
}
