use crate::config::TindexConfig;
use crate::error::{Result, TindexError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tindex_tags::{Line, TagSet};

pub(crate) const IDX_FILE_NAME: &str = "tindex.dat";
pub(crate) const IDX_BACKUP_FILE_NAME: &str = "tindex.bak";

/// In-memory index entry: the parsed tag set, the raw source string it was
/// created from, and the journal the source maps to. The journal id is
/// assigned once and never changes.
#[derive(Debug, Clone)]
pub(crate) struct EntryDesc {
    pub tags: TagSet,
    pub src: String,
    pub journal_id: String,
}

/// Persisted form of one entry. The canonical line is the document key and
/// is re-derived from `src` on load, so only the source string and the id
/// are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedEntry {
    src: String,
    journal_id: String,
}

pub(crate) fn index_file(cfg: &TindexConfig) -> PathBuf {
    cfg.working_dir.join(IDX_FILE_NAME)
}

pub(crate) fn backup_file(cfg: &TindexConfig) -> PathBuf {
    cfg.working_dir.join(IDX_BACKUP_FILE_NAME)
}

/// Writes the whole index to `tindex.dat`, rotating any existing snapshot to
/// `tindex.bak` first.
///
/// Rename-then-write is not atomic across a crash between the two steps, but
/// the previous snapshot is never silently overwritten by a partially
/// written new one.
pub(crate) fn save(cfg: &TindexConfig, tmap: &HashMap<Line, EntryDesc>) -> Result<()> {
    if !cfg.persistence_enabled {
        log::warn!("will not save the tag index, persistence is disabled");
        return Ok(());
    }

    let path = index_file(cfg);
    if path.exists() {
        let backup = backup_file(cfg);
        std::fs::rename(&path, &backup).map_err(|source| TindexError::Persistence {
            what: format!(
                "rename file {} to {}",
                path.display(),
                backup.display()
            ),
            source,
        })?;
    }

    let doc: BTreeMap<&str, PersistedEntry> = tmap
        .iter()
        .map(|(line, desc)| {
            (
                line.as_str(),
                PersistedEntry {
                    src: desc.src.clone(),
                    journal_id: desc.journal_id.clone(),
                },
            )
        })
        .collect();
    let data = serde_json::to_vec_pretty(&doc)?;
    std::fs::write(&path, data).map_err(|source| TindexError::Persistence {
        what: format!("write file {}", path.display()),
        source,
    })?;

    log::debug!("saved {} index records to {}", doc.len(), path.display());
    Ok(())
}

/// Loads the index snapshot. A missing file is a first run and yields an
/// empty index; an unreadable document or a stored source that no longer
/// canonicalizes to its key fails the whole load.
pub(crate) fn load(cfg: &TindexConfig) -> Result<HashMap<Line, EntryDesc>> {
    let mut tmap = HashMap::new();
    if !cfg.persistence_enabled {
        log::debug!("persistence is disabled, starting with an empty tag index");
        return Ok(tmap);
    }

    let path = index_file(cfg);
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("no index snapshot found at {}, starting empty", path.display());
            return Ok(tmap);
        }
        Err(source) => {
            return Err(TindexError::Persistence {
                what: format!("read file {}", path.display()),
                source,
            })
        }
    };

    let doc: HashMap<String, PersistedEntry> =
        serde_json::from_slice(&data).map_err(|err| {
            TindexError::Deserialize(format!(
                "snapshot {} is not a valid index document: {err}",
                path.display()
            ))
        })?;

    for (key, entry) in doc {
        let tags = TagSet::parse(&entry.src).map_err(|err| {
            TindexError::Deserialize(format!(
                "stored source {:?} does not parse any more: {err}",
                entry.src
            ))
        })?;
        if tags.is_empty() {
            return Err(TindexError::Deserialize(format!(
                "stored source {:?} describes no tags",
                entry.src
            )));
        }
        let line = tags.line();
        if line.as_str() != key {
            return Err(TindexError::Deserialize(format!(
                "stored key {key:?} does not match canonical line {:?} of source {:?}",
                line.as_str(),
                entry.src
            )));
        }
        tmap.insert(
            line,
            EntryDesc {
                tags,
                src: entry.src,
                journal_id: entry.journal_id,
            },
        );
    }

    log::info!("loaded {} index records from {}", tmap.len(), path.display());
    Ok(tmap)
}
