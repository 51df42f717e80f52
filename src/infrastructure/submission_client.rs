use std::thread;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::domain::ports::SubmissionClient;
use crate::domain::submission::{SubmissionError, SubmissionReceipt, SubmissionRequest};

// ── HTTP ──────────────────────────────────────────────────────────────────────

/// Posts consolidated orders to `{base_url}/orders`.
///
/// Built on reqwest's blocking client, so it must be constructed and called
/// outside the async runtime's worker threads.
pub struct HttpSubmissionClient {
    http: Client,
    endpoint: String,
}

impl HttpSubmissionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SubmissionError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/orders", base_url.trim_end_matches('/')),
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> SubmissionError {
    if e.is_timeout() {
        SubmissionError::Timeout
    } else {
        SubmissionError::Unavailable(e.to_string())
    }
}

impl SubmissionClient for HttpSubmissionClient {
    fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt, SubmissionError> {
        log::debug!(
            "Submitting {} items for reseller {} to {}",
            request.items.len(),
            request.reseller_identifier,
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SubmissionError::Unavailable(format!(
                "upstream answered {}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<SubmissionReceipt>()
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))
    }
}

// ── Mock ──────────────────────────────────────────────────────────────────────

/// Stand-in for the upstream API that accepts every request except for a
/// random share of them.
pub struct MockSubmissionClient {
    failure_rate: f64,
}

impl MockSubmissionClient {
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

impl SubmissionClient for MockSubmissionClient {
    fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt, SubmissionError> {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.failure_rate) {
            log::warn!(
                "Mock upstream failing submission for reseller {}",
                request.reseller_identifier
            );
            return Err(SubmissionError::Unavailable(
                "simulated upstream failure".to_string(),
            ));
        }

        let now = Utc::now();
        let reference_number = format!(
            "AMB-{}-{:04}",
            now.format("%Y%m%d"),
            rng.gen_range(0..10_000)
        );
        log::info!(
            "Mock upstream accepted {} items as {}",
            request.items.len(),
            reference_number
        );

        Ok(SubmissionReceipt {
            reference_number,
            items: request.items.clone(),
            submitted_at: now,
        })
    }
}

// ── Resilience ────────────────────────────────────────────────────────────────

/// Retries transient failures of `C` with exponential delay
/// `base_delay * 2^attempt`. Rejections and invalid responses are returned
/// immediately.
pub struct ResilientSubmissionClient<C> {
    inner: C,
    max_retries: u32,
    base_delay: Duration,
}

impl<C: SubmissionClient> ResilientSubmissionClient<C> {
    pub fn new(inner: C, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }
}

impl<C: SubmissionClient> SubmissionClient for ResilientSubmissionClient<C> {
    fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionReceipt, SubmissionError> {
        let mut attempt = 0;
        loop {
            match self.inner.submit(request) {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt);
                    log::warn!(
                        "Submission attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
