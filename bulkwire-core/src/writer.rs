//! Size-bounded batching in front of a [`BulkClient`].

use crate::{
    client::{BulkClient, BulkReport, SubmitOptions},
    error::Result,
    operation::WriteOperation,
};
use bulkwire_transport::Transport;
use tracing::debug;

/// Totals across every batch a writer has flushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Batches submitted successfully.
    pub batches: u64,
    /// Operations written.
    pub operations: u64,
    /// Operations acknowledged by the cluster.
    pub accepted: u64,
    /// Operations that failed with a tolerated status.
    pub ignored: u64,
    /// Per-operation resends.
    pub retried: u64,
    /// Send attempts.
    pub attempts: u64,
    /// Encoded bytes of the submitted batches.
    pub bytes: u64,
}

/// Accumulates operations and submits them in batches.
///
/// A batch is flushed once it holds `batch_size_entries` operations or
/// `batch_size_bytes` encoded bytes, whichever comes first. A threshold of
/// zero disables that measure.
///
/// ```no_run
/// # use bulkwire_core::{BulkClient, BulkSettings, BulkWriter, WriteOperation};
/// # use bulkwire_transport::{HttpTransport, HttpTransportConfig};
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = HttpTransport::new(HttpTransportConfig::new("http://localhost:9200"))?;
/// let client = BulkClient::new(transport, BulkSettings::default().with_batch_size(500, 0));
/// let mut writer = BulkWriter::new(client);
///
/// for i in 0..2_000 {
///     let id = i.to_string();
///     writer.write(WriteOperation::index("events", Some(id.as_str()), &serde_json::json!({ "n": i }))?).await?;
/// }
///
/// let stats = writer.finish().await?;
/// assert_eq!(stats.batches, 4);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BulkWriter<T> {
    client: BulkClient<T>,
    options: SubmitOptions,
    pending: Vec<WriteOperation>,
    pending_bytes: usize,
    stats: WriterStats,
}

impl<T: Transport> BulkWriter<T> {
    /// Create a writer using the client's batch thresholds.
    pub fn new(client: BulkClient<T>) -> Self {
        Self {
            client,
            options: SubmitOptions::default(),
            pending: Vec::new(),
            pending_bytes: 0,
            stats: WriterStats::default(),
        }
    }

    /// Apply `options` to every batch this writer submits.
    pub fn with_options(mut self, options: SubmitOptions) -> Self {
        self.options = options;
        self
    }

    /// The underlying client.
    pub fn client(&self) -> &BulkClient<T> {
        &self.client
    }

    /// Operations waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Encoded size of the pending operations.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    /// Totals so far.
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Queue `operation`, flushing when a threshold is reached.
    ///
    /// Returns the report of the batch this write flushed, if any.
    pub async fn write(&mut self, operation: WriteOperation) -> Result<Option<BulkReport>> {
        self.pending_bytes += operation.len();
        self.pending.push(operation);

        if self.is_full() {
            return self.flush().await.map(Some);
        }
        Ok(None)
    }

    /// Submit everything pending. On error the pending batch is dropped.
    pub async fn flush(&mut self) -> Result<BulkReport> {
        if self.pending.is_empty() {
            return Ok(BulkReport::default());
        }

        let batch = std::mem::take(&mut self.pending);
        let bytes = std::mem::take(&mut self.pending_bytes);
        let operations = batch.len();
        debug!(operations, bytes, "Flushing bulk batch");

        let report = self.client.submit_with(batch, self.options.clone()).await?;

        self.stats.batches += 1;
        self.stats.operations += operations as u64;
        self.stats.accepted += report.accepted as u64;
        self.stats.ignored += report.ignored.len() as u64;
        self.stats.retried += report.retried as u64;
        self.stats.attempts += u64::from(report.attempts);
        self.stats.bytes += bytes as u64;

        Ok(report)
    }

    /// Flush the remainder and return the totals.
    pub async fn finish(mut self) -> Result<WriterStats> {
        self.flush().await?;
        Ok(self.stats)
    }

    /// Write every operation from `operations`, stopping at the first error.
    #[cfg(feature = "bulk-stream")]
    pub async fn write_stream<S>(&mut self, operations: S) -> Result<()>
    where
        S: futures::Stream<Item = WriteOperation>,
    {
        use futures::StreamExt;

        let mut operations = std::pin::pin!(operations);
        while let Some(operation) = operations.next().await {
            self.write(operation).await?;
        }
        Ok(())
    }

    fn is_full(&self) -> bool {
        let settings = self.client.settings();
        (settings.batch_size_entries > 0 && self.pending.len() >= settings.batch_size_entries)
            || (settings.batch_size_bytes > 0 && self.pending_bytes >= settings.batch_size_bytes)
    }
}
