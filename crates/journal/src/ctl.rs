use crate::JournalId;
use async_trait::async_trait;

/// Read-only view of the journal storage backend.
#[async_trait]
pub trait JournalCtl: Send + Sync {
    /// Snapshot of the journal ids the backend currently holds. May be
    /// empty, never "absent".
    async fn journals(&self) -> Vec<JournalId>;
}

/// In-memory controller over a fixed id list, for tests and simple wiring.
#[derive(Debug, Clone, Default)]
pub struct StaticJournalCtl {
    ids: Vec<JournalId>,
}

impl StaticJournalCtl {
    #[must_use]
    pub fn new(ids: Vec<JournalId>) -> Self {
        Self { ids }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JournalCtl for StaticJournalCtl {
    async fn journals(&self) -> Vec<JournalId> {
        self.ids.clone()
    }
}
