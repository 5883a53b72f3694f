//! Persistence writer pool
//!
//! Writers own all disk I/O. When cancelled, a writer keeps taking documents
//! off the write queue until it is empty before it exits, so a document that
//! reached the queue always reaches the disk.

use crate::crawler::context::HarvestContext;
use crate::entity::FetchResult;
use crate::frontier::WriteQueue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One member of the writer pool
pub struct PersistenceWriter {
    id: usize,
    ctx: Arc<HarvestContext>,
    queue: Arc<WriteQueue>,
    cancel: CancellationToken,
}

impl PersistenceWriter {
    pub fn new(
        id: usize,
        ctx: Arc<HarvestContext>,
        queue: Arc<WriteQueue>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            ctx,
            queue,
            cancel,
        }
    }

    /// Writes queued documents until cancelled, then flushes what is left
    pub async fn run(self) {
        tracing::info!("Writer {} started", self.id);

        loop {
            let result = tokio::select! {
                biased;
                result = self.queue.get() => result,
                _ = self.cancel.cancelled() => break,
            };
            self.persist(result).await;
        }

        let mut flushed = 0;
        while let Some(result) = self.queue.try_get() {
            self.persist(result).await;
            flushed += 1;
        }

        if flushed > 0 {
            tracing::info!(
                "Writer {} flushed {} queued documents on shutdown",
                self.id,
                flushed
            );
        }
        tracing::info!("Writer {} stopped", self.id);
    }

    /// Writes one document and acknowledges it, whatever the outcome
    ///
    /// A failed write is logged and counted; the writer moves on.
    async fn persist(&self, result: FetchResult) {
        match self.ctx.store.write(&result.item, &result.payload).await {
            Ok(path) => {
                tracing::debug!(
                    "Wrote {} ({} bytes received) to {}",
                    result.item,
                    result.body_len(),
                    path.display()
                );
                self.ctx.stats.record_persisted();
            }
            Err(e) => {
                tracing::error!("Failed to write {}: {}", result.item, e);
                self.ctx.stats.record_write_failure();
            }
        }
        self.queue.ack();
    }
}
