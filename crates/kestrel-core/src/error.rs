use thiserror::Error;

/// Core error types for kestrel
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tensor shape: {0}")]
    InvalidShape(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid model format: {0}")]
    InvalidFormat(String),

    #[error("Tokenizer vocabulary holds {actual} pieces but the model expects {expected}")]
    VocabSize { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
