use std::collections::HashSet;
use tindex_journal::JournalId;

/// Outcome of reconciling the loaded index against the backend's journal
/// set.
///
/// The two directions of divergence are deliberately asymmetric: a journal
/// with no index record is unreachable by tag lookup and therefore fatal,
/// while a stale index record pointing at a vanished journal is only
/// reported and kept.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Journals the backend holds that no index record references. Fatal.
    pub orphaned: Vec<JournalId>,
    /// Journals referenced by the index that the backend no longer holds.
    pub stale: Vec<JournalId>,
}

impl ConsistencyReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.orphaned.is_empty()
    }
}

/// Compares the journal ids referenced by the index with the ids the
/// backend reports. Both result lists are sorted for deterministic logs.
pub fn reconcile<'a, I>(indexed: I, known: &[JournalId]) -> ConsistencyReport
where
    I: IntoIterator<Item = &'a str>,
{
    let mut remaining: HashSet<&str> = indexed.into_iter().collect();
    let mut report = ConsistencyReport::default();

    for id in known {
        if !remaining.remove(id.as_str()) {
            report.orphaned.push(id.clone());
        }
    }
    report.stale = remaining.into_iter().map(str::to_string).collect();

    report.orphaned.sort();
    report.stale.sort();
    report
}
