use crate::JournalId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Produces fresh, collision-free journal identifiers.
pub trait IdGen: Send + Sync {
    fn next(&self) -> JournalId;
}

/// Default generator: hyphenated UUIDv4.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGen;

impl IdGen for UuidGen {
    fn next(&self) -> JournalId {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-N` generator for tests.
#[derive(Debug)]
pub struct SeqIdGen {
    prefix: String,
    next: AtomicU64,
}

impl SeqIdGen {
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGen for SeqIdGen {
    fn next(&self) -> JournalId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uuid_gen_never_repeats() {
        let ids = UuidGen;
        assert_ne!(ids.next(), ids.next());
    }

    #[test]
    fn seq_gen_counts_from_one() {
        let ids = SeqIdGen::new("j");
        assert_eq!(ids.next(), "j-1");
        assert_eq!(ids.next(), "j-2");
    }
}
