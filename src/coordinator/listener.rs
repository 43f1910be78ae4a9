use crate::error::AthenaError;
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use std::sync::Arc;

/// Receives the outcome of every poll cycle.
#[async_trait]
pub trait SnapshotListener: Send + Sync {
    /// Called after a new snapshot has been published
    async fn on_snapshot(&self, snapshot: Arc<Snapshot>);

    /// Called after a failed cycle; the previous snapshot is still current
    async fn on_update_failed(&self, _error: &AthenaError) {}

    fn listener_name(&self) -> &str;
}

/// Adapter turning a plain closure into a [`SnapshotListener`]
pub struct FnListener<F> {
    name: String,
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(Arc<Snapshot>) + Send + Sync,
{
    pub fn new<S: Into<String>>(name: S, callback: F) -> Self {
        Self {
            name: name.into(),
            callback,
        }
    }
}

#[async_trait]
impl<F> SnapshotListener for FnListener<F>
where
    F: Fn(Arc<Snapshot>) + Send + Sync,
{
    async fn on_snapshot(&self, snapshot: Arc<Snapshot>) {
        (self.callback)(snapshot);
    }

    fn listener_name(&self) -> &str {
        &self.name
    }
}
