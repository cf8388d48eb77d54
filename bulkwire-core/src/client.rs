//! Bulk client: the encode, send, decode, classify and retry loop.

use crate::{
    buffer::TrackedBuffer,
    encoder,
    error::{BulkError, BulkResult, DecodeError},
    operation::WriteOperation,
    policy::{ClassifiedOutcomes, StatusPolicy},
    response::{self, BulkOutcome},
    settings::BulkSettings,
};
use bulkwire_transport::{Method, Transport, TransportError, TransportResponse};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Summary of a successful submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// Send attempts made.
    pub attempts: u32,
    /// Final outcome of every operation, ordered by ordinal.
    pub outcomes: Vec<BulkOutcome>,
    /// Operations acknowledged by the cluster.
    pub accepted: usize,
    /// Operations that failed with a tolerated status.
    pub ignored: Vec<BulkOutcome>,
    /// Resends performed, counted per operation.
    pub retried: usize,
}

impl BulkReport {
    /// Number of operations covered by the report.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Per-submission cancellation and deadline.
///
/// Both are checked before every attempt, including the first, and
/// interrupt backoff waits. A send already in flight is never cut short.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl SubmitOptions {
    /// No cancellation, no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop once `token` is canceled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Stop once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop once `timeout` has elapsed from now. A timeout too large to
    /// represent as an instant sets no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    fn is_canceled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Sleep for `delay`; false when canceled or past the deadline first.
    async fn wait(&self, delay: Duration) -> bool {
        let canceled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = canceled => false,
            _ = expired => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

enum ResponseError {
    Transport(TransportError),
    Decode(DecodeError),
}

impl ResponseError {
    fn into_bulk_error(self, attempts: u32, outcomes: Vec<BulkOutcome>) -> BulkError {
        match self {
            Self::Transport(source) => BulkError::Transport {
                source,
                attempts,
                outcomes,
            },
            Self::Decode(source) => BulkError::Decode {
                source,
                attempts,
                outcomes,
            },
        }
    }
}

/// Client for bulk writes against one transport.
///
/// Build it once and clone it into every task that writes; clones share
/// the transport, the settings and the closed flag. Settings are frozen at
/// construction.
pub struct BulkClient<T> {
    transport: Arc<T>,
    settings: Arc<BulkSettings>,
    policy: Arc<StatusPolicy>,
    closed: Arc<AtomicBool>,
}

impl<T> Clone for BulkClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            settings: self.settings.clone(),
            policy: self.policy.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T: Transport> BulkClient<T> {
    /// Create a client owning `transport`.
    pub fn new(transport: T, settings: BulkSettings) -> Self {
        Self::with_shared_transport(Arc::new(transport), settings)
    }

    /// Create a client over a transport shared with other components.
    pub fn with_shared_transport(transport: Arc<T>, settings: BulkSettings) -> Self {
        let ignore: Vec<u16> = settings.status_ignore.statuses().collect();
        debug!(
            path = %settings.bulk_path,
            ignore = ?ignore,
            max_retries = settings.retry.max_retries,
            "Initializing bulk client"
        );

        let policy = settings.status_policy();
        Self {
            transport,
            settings: Arc::new(settings),
            policy: Arc::new(policy),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &BulkSettings {
        &self.settings
    }

    /// Get the classification table.
    pub fn policy(&self) -> &StatusPolicy {
        &self.policy
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Refuse further submissions from this client and all its clones.
    /// Submissions already running finish normally.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Bulk client closed");
        }
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Write `operations` in one logical bulk submission.
    pub async fn submit(&self, operations: Vec<WriteOperation>) -> BulkResult {
        self.submit_with(operations, SubmitOptions::default()).await
    }

    /// Write `operations`, honoring cancellation and deadline.
    pub async fn submit_with(
        &self,
        operations: Vec<WriteOperation>,
        options: SubmitOptions,
    ) -> BulkResult {
        let (buffer, _) = encoder::encode(&operations);
        self.submit_buffer(buffer, options).await
    }

    /// Write an already tracked buffer, for instance one produced by
    /// [`encoder::decode_request`].
    pub async fn submit_buffer(&self, buffer: TrackedBuffer, options: SubmitOptions) -> BulkResult {
        if self.is_closed() {
            return Err(BulkError::Closed);
        }
        if buffer.is_empty() {
            return Ok(BulkReport::default());
        }

        let mut buffer = buffer;
        let mut latest: BTreeMap<usize, BulkOutcome> = BTreeMap::new();
        let mut report = BulkReport::default();

        loop {
            if options.is_canceled() {
                debug!(attempts = report.attempts, "Bulk submission canceled");
                return Err(BulkError::Canceled {
                    attempts: report.attempts,
                    outcomes: latest.into_values().collect(),
                });
            }

            report.attempts += 1;
            let attempt = report.attempts;
            debug!(
                attempt,
                items = buffer.span_count(),
                bytes = buffer.len(),
                "Sending bulk request"
            );

            let classified = match self.send_attempt(&buffer).await {
                Ok(classified) => classified,
                Err(e) => return Err(e.into_bulk_error(attempt, latest.into_values().collect())),
            };

            trace!(
                attempt,
                accepted = classified.accepted.len(),
                ignored = classified.ignored.len(),
                retry = classified.retry.len(),
                fatal = classified.fatal.len(),
                "Classified bulk response"
            );

            for outcome in classified
                .accepted
                .iter()
                .chain(&classified.ignored)
                .chain(&classified.retry)
                .chain(&classified.fatal)
            {
                latest.insert(outcome.ordinal, outcome.clone());
            }
            report.accepted += classified.accepted.len();
            report.ignored.extend(classified.ignored.iter().cloned());

            if let Some(first) = classified.fatal.first().cloned() {
                return Err(BulkError::ItemFatal {
                    first,
                    fatal: classified.fatal,
                    outcomes: latest.into_values().collect(),
                    attempts: attempt,
                });
            }

            if classified.retry.is_empty() {
                report.outcomes = latest.into_values().collect();
                return Ok(report);
            }

            let retries_done = attempt - 1;
            if !self.settings.retry.allows_retry(retries_done) {
                debug!(
                    attempts = attempt,
                    remaining = classified.retry.len(),
                    "Bulk retries exhausted"
                );
                return Err(BulkError::RetriesExhausted {
                    attempts: attempt,
                    remaining: classified.retry,
                    outcomes: latest.into_values().collect(),
                });
            }

            buffer = buffer.extract(classified.retry_ordinals())?;
            report.retried += buffer.span_count();

            let delay = self.settings.retry.delay_for_retry(retries_done);
            debug!(
                attempt,
                retry = buffer.span_count(),
                delay_ms = delay.as_millis() as u64,
                "Retrying rejected bulk items"
            );

            if !options.wait(delay).await {
                debug!(attempts = attempt, "Bulk submission canceled during backoff");
                return Err(BulkError::Canceled {
                    attempts: attempt,
                    outcomes: latest.into_values().collect(),
                });
            }
        }
    }

    /// Judge one bulk response to the request held in `sent`.
    ///
    /// Checks the envelope status, decodes and classifies every item, and
    /// fails with [`BulkError::ItemFatal`] when any item is fatal. Retry
    /// items are returned for the caller to act on.
    pub fn process_response(
        &self,
        response: TransportResponse,
        sent: &TrackedBuffer,
    ) -> Result<ClassifiedOutcomes, BulkError> {
        let classified = self
            .classify_response(response, sent)
            .map_err(|e| e.into_bulk_error(1, Vec::new()))?;

        if let Some(first) = classified.fatal.first().cloned() {
            return Err(BulkError::ItemFatal {
                first,
                fatal: classified.fatal.clone(),
                outcomes: classified.into_outcomes(),
                attempts: 1,
            });
        }

        Ok(classified)
    }

    async fn send_attempt(&self, buffer: &TrackedBuffer) -> Result<ClassifiedOutcomes, ResponseError> {
        let response = self
            .transport
            .send(Method::POST, &self.settings.bulk_path, buffer.to_bytes())
            .await
            .map_err(ResponseError::Transport)?;

        self.classify_response(response, buffer)
    }

    fn classify_response(
        &self,
        response: TransportResponse,
        sent: &TrackedBuffer,
    ) -> Result<ClassifiedOutcomes, ResponseError> {
        let response = response.error_for_status().map_err(ResponseError::Transport)?;
        let outcomes =
            response::decode(response.bytes(), sent.spans()).map_err(ResponseError::Decode)?;
        Ok(self.policy.partition(outcomes))
    }
}

impl<T> std::fmt::Debug for BulkClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkClient")
            .field("bulk_path", &self.settings.bulk_path)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
