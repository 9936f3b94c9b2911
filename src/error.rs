use thiserror::Error;

/// Errors produced while building, decoding or training a hidden Markov model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HmmError {
    /// A parameter does not have the shape implied by the rest of the model.
    #[error("dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    /// The model has no states or no observation symbols.
    #[error("model must have at least one state and one observation symbol")]
    EmptyModel,

    /// Decoding needs at least one observation.
    #[error("observation sequence is empty")]
    EmptyObservations,

    /// An observation index does not name a symbol of the model.
    #[error("observation {symbol} at position {position} is out of range (n_symbols = {n_symbols})")]
    SymbolOutOfRange {
        position: usize,
        symbol: usize,
        n_symbols: usize,
    },

    /// A label was looked up in a space that does not contain it.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// A label space was given the same label twice.
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// A probability row cannot be sampled from.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
}

impl HmmError {
    pub fn dimension_mismatch(what: impl Into<String>, expected: usize, found: usize) -> Self {
        HmmError::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    pub fn invalid_distribution(msg: impl Into<String>) -> Self {
        HmmError::InvalidDistribution(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, HmmError>;
