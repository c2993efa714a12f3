use thiserror::Error;

pub type Result<T> = std::result::Result<T, TagError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("missing '=' separator in tag \"{0}\"")]
    MissingSeparator(String),

    #[error("empty tag key in \"{0}\"")]
    EmptyKey(String),

    #[error("duplicate tag key \"{0}\"")]
    DuplicateKey(String),

    #[error("unterminated quoted value in \"{0}\"")]
    UnterminatedQuote(String),

    #[error("unbalanced braces in \"{0}\"")]
    UnbalancedBraces(String),

    #[error("selector syntax error at offset {pos}: {message}")]
    Selector { pos: usize, message: String },
}
