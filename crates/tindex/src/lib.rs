//! # Tindex
//!
//! The tag-to-journal index of a log storage engine: maps an unordered set
//! of descriptive tags (a source identity) to the append-only journal
//! holding that source's records, creating journals on demand and keeping
//! the mapping consistent with what the backend actually has on disk.
//!
//! ## Flow
//!
//! ```text
//! init
//!     │
//!     ├──> Load snapshot (tindex.dat)
//!     │      └─> re-canonicalize every stored source
//!     │
//!     ├──> Reconcile vs journal backend
//!     │      ├─> journal without index record → fatal
//!     │      └─> index record without journal → warning, kept
//!     │
//!     └──> Re-save (exercises the write path up front)
//!
//! runtime
//!     ├──> get_or_create_journal: lookup | create + save (rollback on error)
//!     └──> get_journals: selector scan, capped results / exact count
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tindex::{TagIndex, TindexConfig};
//! use tindex_journal::StaticJournalCtl;
//!
//! #[tokio::main]
//! async fn main() -> tindex::Result<()> {
//!     let index = TagIndex::new(
//!         TindexConfig::new("/var/lib/tindex"),
//!         Arc::new(StaticJournalCtl::empty()),
//!     );
//!     index.init().await?;
//!
//!     let journal = index.get_or_create_journal("app=web, pod=api-0")?;
//!     let (matched, total) = index.get_journals("app=web", 100, false)?;
//!     println!("{journal}: {} of {total} sources", matched.len());
//!
//!     index.shutdown();
//!     Ok(())
//! }
//! ```

mod config;
mod consistency;
mod error;
mod persist;
mod service;

pub use config::TindexConfig;
pub use consistency::{reconcile, ConsistencyReport};
pub use error::{Result, TindexError};
pub use service::TagIndex;
