use thiserror::Error;
use tindex_tags::TagError;

pub type Result<T> = std::result::Result<T, TindexError>;

#[derive(Error, Debug)]
pub enum TindexError {
    #[error("invalid tag format: {0}")]
    InvalidTagFormat(#[from] TagError),

    #[error("at least one tag value is expected to define the source")]
    EmptySourceTags,

    #[error("service is shut down")]
    ServiceClosed,

    #[error("invalid config: {0}")]
    Config(String),

    #[error("could not {what}: {source}")]
    Persistence {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize tag index: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not read tag index snapshot: {0}")]
    Deserialize(String),

    #[error(
        "data is inconsistent: {journals} journals and {records} index records found, \
         some journals have no record in the tag index"
    )]
    Inconsistent { journals: usize, records: usize },
}
