use thiserror::Error;

/// Errors that can occur while turning feature vectors into symbols.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AbstractionError {
    #[error("abstractor was used before it was fitted")]
    NotFitted,
    #[error("cannot fit a clustering on zero feature vectors")]
    EmptyInput,
    #[error("feature vector {0:?} was not seen during fitting")]
    UnknownVector(Vec<f64>),
    #[error("expected feature vectors of dimension {expected} but got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("invalid clustering parameter: {0}")]
    InvalidParameter(String),
}

/// Abstracts the types of errors that can occur when loading symbol sequences.
#[derive(Debug, Error)]
pub enum SampleParseError {
    #[error("could not read sample: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse csv sample: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {0} has no `:` separating session and symbols")]
    MissingDelimiter(usize),
    #[error("line {0} has an empty session name")]
    EmptySession(usize),
    #[error("session `{1}` on line {0} was already defined")]
    DuplicateSession(usize, String),
}

/// Errors reported by the control flow pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("trace contains no message events")]
    NoEvents,
    #[error(transparent)]
    Abstraction(#[from] AbstractionError),
}
