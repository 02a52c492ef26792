//! Feeds audit records to projections.

use audit_log::{AuditLog, AuditRecord};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Delivers records from an audit log to registered projections.
///
/// Supports catch-up (deliver every record a projection has not seen yet),
/// single-record delivery and full rebuild. Catch-up and rebuild runs are
/// serialized so no record reaches a projection twice.
pub struct ProjectionProcessor<S: AuditLog> {
    log: S,
    projections: Vec<Box<dyn Projection>>,
    run_gate: Mutex<()>,
}

impl<S: AuditLog> ProjectionProcessor<S> {
    pub fn new(log: S) -> Self {
        Self {
            log,
            projections: Vec::new(),
            run_gate: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Streams the whole log and hands each projection the records past
    /// its position.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<()> {
        let _gate = self.run_gate.lock().await;
        self.catch_up().await
    }

    async fn catch_up(&self) -> Result<()> {
        let mut stream = self.log.stream_all().await?;
        let mut scanned: u64 = 0;
        let mut delivered: u64 = 0;

        while let Some(result) = stream.next().await {
            let record = result?;
            scanned += 1;

            for projection in &self.projections {
                if !projection.position().await.covers(&record) {
                    projection.handle(&record).await?;
                    metrics::counter!(
                        "projections_events_processed",
                        "projection" => projection.name()
                    )
                    .increment(1);
                    delivered += 1;
                }
            }
        }

        tracing::debug!(records = scanned, delivered, "catch-up complete");
        Ok(())
    }

    /// Delivers one freshly appended record to every projection that has
    /// not seen it yet.
    #[tracing::instrument(skip(self, record), fields(event_type = %record.event_type))]
    pub async fn process_record(&self, record: &AuditRecord) -> Result<()> {
        for projection in &self.projections {
            if !projection.position().await.covers(record) {
                projection.handle(record).await?;
            }
        }
        Ok(())
    }

    /// Resets every projection and replays the log from the start.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<()> {
        let _gate = self.run_gate.lock().await;
        for projection in &self.projections {
            projection.reset().await?;
        }
        tracing::info!(projections = self.projections.len(), "rebuilding projections");
        self.catch_up().await
    }
}
