use crate::config::TindexConfig;
use crate::consistency::reconcile;
use crate::error::{Result, TindexError};
use crate::persist::{self, EntryDesc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tindex_journal::{IdGen, JournalCtl, JournalId, UuidGen};
use tindex_tags::{Line, Selector, TagSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Running,
    Shutdown,
}

struct Inner {
    state: Lifecycle,
    tmap: HashMap<Line, EntryDesc>,
}

impl Inner {
    fn check_running(&self) -> Result<()> {
        match self.state {
            Lifecycle::Running => Ok(()),
            _ => Err(TindexError::ServiceClosed),
        }
    }
}

/// The tag-to-journal index service.
///
/// A single mutex guards the map and the lifecycle state; it is held for the
/// full duration of a lookup, a create-and-persist sequence or the shutdown
/// transition, and never across an await. Every mutation is persisted before
/// it is considered committed: a failed save rolls the in-memory change back,
/// so the map never contains an entry without a durable record.
pub struct TagIndex {
    cfg: TindexConfig,
    journals: Arc<dyn JournalCtl>,
    ids: Box<dyn IdGen>,
    inner: Mutex<Inner>,
}

impl TagIndex {
    pub fn new(cfg: TindexConfig, journals: Arc<dyn JournalCtl>) -> TagIndex {
        Self::with_id_gen(cfg, journals, Box::new(UuidGen))
    }

    pub fn with_id_gen(
        cfg: TindexConfig,
        journals: Arc<dyn JournalCtl>,
        ids: Box<dyn IdGen>,
    ) -> TagIndex {
        TagIndex {
            cfg,
            journals,
            ids,
            inner: Mutex::new(Inner {
                state: Lifecycle::Uninitialized,
                tmap: HashMap::new(),
            }),
        }
    }

    /// Initializes the service: loads the persisted snapshot, reconciles it
    /// against the journal backend and re-saves it. Call once, before
    /// serving; on any error the service stays uninitialized and refuses all
    /// operations.
    ///
    /// The re-save runs even when nothing changed: it normalizes the on-disk
    /// format and surfaces a broken write path at startup instead of at the
    /// first mutation.
    pub async fn init(&self) -> Result<()> {
        log::info!("initializing tag index");
        self.cfg.check()?;

        // The listing may block on the backend; keep it outside the lock.
        let known = self.journals.journals().await;
        let loaded = persist::load(&self.cfg)?;

        let mut inner = self.lock();
        if inner.state == Lifecycle::Shutdown {
            return Err(TindexError::ServiceClosed);
        }

        let report = reconcile(loaded.values().map(|d| d.journal_id.as_str()), &known);
        for id in &report.orphaned {
            log::error!("found journal {id}, but it is not in the tag index");
        }
        if !report.stale.is_empty() {
            log::warn!(
                "tag index contains {} records which don't have corresponding journals",
                report.stale.len()
            );
        }
        if !report.is_consistent() {
            log::error!(
                "consistency check failed: {} journals found and {} records in the tag index",
                known.len(),
                loaded.len()
            );
            return Err(TindexError::Inconsistent {
                journals: known.len(),
                records: loaded.len(),
            });
        }

        inner.tmap = loaded;
        persist::save(&self.cfg, &inner.tmap)?;
        inner.state = Lifecycle::Running;
        log::info!(
            "consistency check passed: {} journals found, {} index records in total",
            known.len(),
            inner.tmap.len()
        );
        Ok(())
    }

    /// Closes the service for business. Taken under the operations lock, so
    /// no mutation is in flight when it returns and none can start after.
    /// Idempotent.
    pub fn shutdown(&self) {
        log::info!("shutting down tag index");
        let mut inner = self.lock();
        inner.state = Lifecycle::Shutdown;
    }

    /// Returns the journal id for the source described by `tags`, creating
    /// and persisting a new entry if the tag combination was never seen.
    ///
    /// At most one entry ever exists per canonical line: concurrent callers
    /// racing on the same tags observe the same id. If the save of a new
    /// entry fails, the insertion is rolled back and the error returned —
    /// a later call starts from scratch.
    pub fn get_or_create_journal(&self, tags: &str) -> Result<JournalId> {
        let mut inner = self.lock();
        inner.check_running()?;

        // Fast path: the raw string is already a canonical line.
        if let Some(desc) = inner.tmap.get(&Line::from(tags)) {
            return Ok(desc.journal_id.clone());
        }

        let parsed = TagSet::parse(tags)?;
        if parsed.is_empty() {
            return Err(TindexError::EmptySourceTags);
        }

        let line = parsed.line();
        if let Some(desc) = inner.tmap.get(&line) {
            return Ok(desc.journal_id.clone());
        }

        let journal_id = self.ids.next();
        inner.tmap.insert(
            line.clone(),
            EntryDesc {
                tags: parsed,
                src: tags.to_string(),
                journal_id: journal_id.clone(),
            },
        );
        if let Err(err) = persist::save(&self.cfg, &inner.tmap) {
            inner.tmap.remove(&line);
            log::error!(
                "could not save state for the new journal {journal_id} formed for {line}, \
                 original tags {tags:?}: {err}"
            );
            return Err(err);
        }

        log::debug!("created journal {journal_id} for {line}");
        Ok(journal_id)
    }

    /// Scans the index for entries matching `selector`, returning at most
    /// `max_results` of them keyed by canonical line, plus a match count.
    ///
    /// With `scan_all` the scan always runs to completion and the count is
    /// exact regardless of the cap; without it the scan stops early once the
    /// cap is full and the count only covers what was seen until then.
    pub fn get_journals(
        &self,
        selector: &str,
        max_results: usize,
        scan_all: bool,
    ) -> Result<(HashMap<Line, JournalId>, usize)> {
        let selector = Selector::parse(selector)?;

        let inner = self.lock();
        inner.check_running()?;

        let mut count = 0;
        let mut res = HashMap::new();
        for (line, desc) in &inner.tmap {
            if selector.matches(&desc.tags) {
                count += 1;
                if res.len() < max_results {
                    res.insert(line.clone(), desc.journal_id.clone());
                } else if !scan_all {
                    break;
                }
            }
        }
        Ok((res, count))
    }

    /// Number of index entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().tmap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
