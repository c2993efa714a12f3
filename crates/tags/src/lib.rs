//! # Tindex Tags
//!
//! Tag model for log sources: parsing, canonicalization and selector
//! predicates.
//!
//! A log source is identified by an unordered set of `key=value` tags. Two
//! spellings of the same set (`b=2, a=1` vs `{a=1,b=2}`) must resolve to the
//! same source, so every [`TagSet`] renders to a canonical [`Line`] with keys
//! sorted ascending. The line is what the index keys on.
//!
//! ```rust
//! use tindex_tags::{Selector, TagSet};
//!
//! let tags = TagSet::parse("pod=api-0, app=web")?;
//! assert_eq!(tags.line().as_str(), "app=web,pod=api-0");
//!
//! let selector = Selector::parse("app=web and pod=api-*")?;
//! assert!(selector.matches(&tags));
//! # Ok::<(), tindex_tags::TagError>(())
//! ```

mod error;
mod selector;
mod tag;

pub use error::{Result, TagError};
pub use selector::Selector;
pub use tag::{Line, TagSet};
