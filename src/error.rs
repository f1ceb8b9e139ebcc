use crate::tensor::StaticShape;

/// All errors raised while building a sequence computation.
///
/// Every failure here is a construction-time configuration or programmer
/// error. Nothing in this crate retries; transient failures belong to the
/// tensor engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid combination of driver options (e.g. unrolling an unknown time extent).
    #[error("configuration error: {0}")]
    Config(String),

    /// A nested bundle does not have the structure that was expected.
    #[error("structure mismatch: {0}")]
    StructureMismatch(String),

    /// Two tensors that must agree in shape do not.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: &'static str,
        expected: StaticShape,
        got: StaticShape,
    },

    /// Operation requires a different rank.
    #[error("rank mismatch in {context}: expected rank {expected}, got {got}")]
    RankMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// Logical rank exceeds what a rank-erased tensor can hold.
    #[error("rank {rank} exceeds the supported maximum of {max}")]
    RankTooLarge { rank: usize, max: usize },

    /// Slot or axis index outside the valid range.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Reading from an accumulator that holds nothing at the requested slot(s).
    #[error("tensor array read of unwritten slot(s): {0}")]
    EmptyAccumulator(String),

    /// Unknown axis-ordering (channel layout) string.
    #[error("invalid data_format `{0}`, expected `channels_first` or `channels_last`")]
    InvalidDataFormat(String),

    /// Feature combination that is deliberately not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Failure reported by the tensor engine while reading data back.
    #[error("tensor data error: {0}")]
    Data(String),

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    pub fn config(s: impl Into<String>) -> Self {
        Error::Config(s.into())
    }

    pub fn structure(s: impl Into<String>) -> Self {
        Error::StructureMismatch(s.into())
    }

    pub fn unsupported(s: impl Into<String>) -> Self {
        Error::Unsupported(s.into())
    }

    /// Shape mismatch between two concrete dimension lists.
    pub fn shape(context: &'static str, expected: &[usize], got: &[usize]) -> Self {
        Error::ShapeMismatch {
            context,
            expected: StaticShape::known(expected),
            got: StaticShape::known(got),
        }
    }
}

/// Convenience Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
