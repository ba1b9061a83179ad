//! Error types for tokenization and object building.

use crate::core::tokenizer::State;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Conversion failure.
///
/// `Malformed` is the tokenizer's structural-violation outcome: unclosed
/// tags, quotes or comment/CDATA regions, mismatched close tags, and
/// unexpected end of input. It is reported as a value, never panicked,
/// and no partial object model accompanies it - callers that want the
/// tokens emitted before the failure drive the tokenizer through its
/// observer interface instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Structural well-formedness violation detected by the tokenizer.
    #[error("malformed markup at byte {position} ({state}): {message}")]
    Malformed {
        /// Byte offset into the input where the violation was detected.
        position: usize,
        /// Tokenizer state at the point of failure.
        state: State,
        /// Human-readable description of the violation.
        message: String,
    },

    /// The builder was fed a token stream that does not describe a
    /// balanced element tree (close without open, trailing open frames).
    ///
    /// Streams produced by the tokenizer are always balanced; this only
    /// arises for caller-constructed streams.
    #[error("unbalanced token stream: {0}")]
    UnbalancedTokens(String),
}

impl Error {
    pub(crate) fn malformed(position: usize, state: State, message: impl Into<String>) -> Self {
        Error::Malformed {
            position,
            state,
            message: message.into(),
        }
    }
}
