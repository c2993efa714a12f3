//! # Tindex Journal
//!
//! Contracts the tag index has with the journal storage layer: listing the
//! journals the backend actually holds ([`JournalCtl`]) and minting fresh
//! journal identifiers ([`IdGen`]).
//!
//! The index never creates or deletes journals through these contracts; the
//! backend is read-only from its perspective. Cancellation and timeouts on
//! the listing call are the backend implementation's responsibility.

mod ctl;
mod id;

pub use ctl::{JournalCtl, StaticJournalCtl};
pub use id::{IdGen, SeqIdGen, UuidGen};

/// Identifier of one append-only journal. Globally unique, never reused.
pub type JournalId = String;
