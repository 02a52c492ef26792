//! Read model trait for query-side views.

use async_trait::async_trait;

/// Query access to a projection's data.
#[async_trait]
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries. Waits for an in-flight write to finish.
    async fn count(&self) -> usize;
}
