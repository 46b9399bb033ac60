use std::fmt;

/// Errors raised by pattern flatten/fold operations.
///
/// Length and arity mismatches are always fatal: they are checked on every
/// path, including [`fold_unchecked`](crate::Pattern::fold_unchecked).
/// Domain violations ([`Constraint`](PatternError::Constraint) and the
/// structural variants) are suppressed by the unchecked fold.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternError {
    /// Flat vector length does not match the pattern's flat length.
    WrongLength {
        /// Length the pattern expects for the requested mode.
        expected: usize,
        /// Length actually supplied.
        got: usize,
    },
    /// Number of flat arguments does not match the number of wrapped patterns.
    Arity {
        /// Number of patterns the wrapper was built with.
        expected: usize,
        /// Number of flat slices supplied.
        got: usize,
    },
    /// Folded value violates a domain constraint (shape, bounds, symmetry, ...).
    ///
    /// The message names the violated constraint and its bound.
    Constraint(String),
    /// A dict folded value is missing a named entry.
    MissingEntry(String),
    /// A dict pattern was given a name it already contains.
    DuplicateEntry(String),
    /// Folded value has the wrong container kind (array where a dict is
    /// expected, or vice versa).
    KindMismatch {
        /// `"array"` or `"dict"`.
        expected: &'static str,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::WrongLength { expected, got } => {
                write!(f, "wrong flat length: expected {}, got {}", expected, got)
            }
            PatternError::Arity { expected, got } => {
                write!(f, "wrong argument count: expected {}, got {}", expected, got)
            }
            PatternError::Constraint(msg) => write!(f, "{}", msg),
            PatternError::MissingEntry(name) => {
                write!(f, "folded value is missing entry '{}'", name)
            }
            PatternError::DuplicateEntry(name) => {
                write!(f, "pattern dict already contains entry '{}'", name)
            }
            PatternError::KindMismatch { expected } => {
                write!(f, "folded value has the wrong kind: expected {}", expected)
            }
        }
    }
}

impl std::error::Error for PatternError {}
