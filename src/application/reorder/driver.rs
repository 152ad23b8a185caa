//! Client side of the protocol: drives the passes of one drop to completion.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use super::batch::{PassState, RenumberBatchRequest, RenumberBatchResponse};
use super::intent::ReorderIntent;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The server answered with a failure status. Not retried.
    #[error("server rejected the batch with status {status}")]
    Rejected { status: u16 },
    #[error("network failure: {0}")]
    Network(String),
    #[error("invalid batch response: {0}")]
    Decode(String),
}

impl TransportError {
    fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

/// Sends one batch request and returns the server's answer.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    async fn send(
        &self,
        request: &RenumberBatchRequest,
    ) -> Result<RenumberBatchResponse, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DriverStatus {
    #[default]
    Idle,
    Busy,
    Done,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, at least one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Round trips spent on each pass of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveReport {
    pub destination_round_trips: u32,
    pub source_round_trips: Option<u32>,
}

pub struct BatchDriver<T> {
    transport: T,
    item_type: String,
    retry: RetryPolicy,
    status: watch::Sender<DriverStatus>,
    in_flight: Mutex<()>,
}

impl<T: BatchTransport> BatchDriver<T> {
    pub fn new(transport: T, item_type: impl Into<String>) -> Self {
        let (status, _) = watch::channel(DriverStatus::Idle);
        Self {
            transport,
            item_type: item_type.into(),
            retry: RetryPolicy::default(),
            status,
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<DriverStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> DriverStatus {
        self.status.borrow().clone()
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Persist a drop: the destination pass, then the source pass when the
    /// parent changed. Drops are applied one at a time.
    pub async fn apply(&self, intent: &ReorderIntent) -> Result<DriveReport, TransportError> {
        let _guard = self.in_flight.lock().await;
        self.status.send_replace(DriverStatus::Busy);

        match self.run_passes(intent).await {
            Ok(report) => {
                info!(
                    item_id = intent.item_id,
                    destination = report.destination_round_trips,
                    source = ?report.source_round_trips,
                    "reorder applied"
                );
                self.status.send_replace(DriverStatus::Done);
                Ok(report)
            }
            Err(err) => {
                warn!(item_id = intent.item_id, error = %err, "reorder failed");
                self.status.send_replace(DriverStatus::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn run_passes(&self, intent: &ReorderIntent) -> Result<DriveReport, TransportError> {
        let destination_round_trips = self
            .run_pass(intent.destination_request(&self.item_type))
            .await?;

        let source_round_trips = match intent.source_request(&self.item_type) {
            Some(request) => Some(self.run_pass(request).await?),
            None => None,
        };

        Ok(DriveReport {
            destination_round_trips,
            source_round_trips,
        })
    }

    async fn run_pass(&self, first: RenumberBatchRequest) -> Result<u32, TransportError> {
        let mut request = first;
        let mut state = PassState::Started;
        let mut round_trips = 0u32;

        loop {
            let response = self.send_with_retry(&request).await?;
            round_trips += 1;
            state = state.advance(&response);
            if state.is_done() {
                return Ok(round_trips);
            }
            request = request.continuation(&response);
        }
    }

    async fn send_with_retry(
        &self,
        request: &RenumberBatchRequest,
    ) -> Result<RenumberBatchResponse, TransportError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.transport.send(request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(attempt, error = %err, "batch request failed; retrying");
                    attempt += 1;
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
