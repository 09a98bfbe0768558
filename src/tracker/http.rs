use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{parse_tracker_response, Announcer, RetryPolicy, TrackerResponse};
use crate::error::{Result, SpoofError};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

enum AttemptError {
    /// Network trouble or a non-success status; worth retrying.
    Transient(String),
    /// The tracker answered, but not with a usable announce response.
    Protocol(String),
}

pub struct HttpTracker {
    announce_urls: Vec<String>,
    current: AtomicUsize,
    policy: RetryPolicy,
    client: Client,
}

impl HttpTracker {
    pub fn new(announce_urls: Vec<String>, policy: RetryPolicy) -> Result<Self> {
        if announce_urls.is_empty() {
            return Err(SpoofError::Configuration(
                "at least one announce URL is required".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .gzip(true)
            .build()
            .map_err(|e| SpoofError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            announce_urls,
            current: AtomicUsize::new(0),
            policy,
            client,
        })
    }

    pub fn current_url(&self) -> &str {
        let index = self.current.load(Ordering::Relaxed) % self.announce_urls.len();
        &self.announce_urls[index]
    }

    // A failing tracker goes to the back of the line.
    fn rotate(&self) {
        if self.announce_urls.len() > 1 {
            self.current.fetch_add(1, Ordering::Relaxed);
        }
    }

    async fn try_announce(
        &self,
        query: &str,
        headers: &HashMap<String, String>,
    ) -> std::result::Result<TrackerResponse, AttemptError> {
        let base = self.current_url();
        let separator = if base.contains('?') { '&' } else { '?' };
        let url = format!("{}{}{}", base, separator, query);
        debug!(%url, "Calling tracker");

        let mut request = self.client.get(&url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Transient(format!(
                "tracker returned HTTP {}",
                status
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        parse_tracker_response(&body).map_err(AttemptError::Protocol)
    }
}

#[async_trait]
impl Announcer for HttpTracker {
    async fn announce(
        &self,
        query: &str,
        headers: &HashMap<String, String>,
        retry: bool,
    ) -> Result<Option<TrackerResponse>> {
        let mut delay = self.policy.initial_delay;
        let mut attempts = 0;
        loop {
            let error = match self.try_announce(query, headers).await {
                Ok(response) => return Ok(Some(response)),
                Err(error) => error,
            };

            if !retry {
                let message = match error {
                    AttemptError::Transient(m) | AttemptError::Protocol(m) => m,
                };
                warn!(error = %message, "Announce failed, not retrying");
                return Ok(None);
            }

            let message = match error {
                AttemptError::Protocol(m) => return Err(SpoofError::TrackerProtocol(m)),
                AttemptError::Transient(m) => m,
            };
            attempts += 1;
            let failed_url = self.current_url().to_string();
            self.rotate();
            if attempts >= self.policy.max_attempts {
                return Err(SpoofError::TrackerUnreachable {
                    attempts,
                    last_error: message,
                });
            }

            warn!(
                tracker = %failed_url,
                error = %message,
                attempt = attempts,
                retry_in_secs = delay.as_secs_f64(),
                "Announce failed"
            );
            tokio::time::sleep(delay).await;
            delay = self.policy.next_delay(delay);
        }
    }
}
