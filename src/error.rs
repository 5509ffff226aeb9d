use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubtitleError {
    /// The markup tokenizer hit a structural error other than end of input.
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),
    /// A sync attribute or timestamp line is missing or not a valid time.
    #[error("malformed timestamp: '{0}'")]
    MalformedTimestamp(String),
    #[error("malformed index: '{0}'")]
    MalformedIndex(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SubtitleError>;
