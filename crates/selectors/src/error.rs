use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Reasons a selector string could not be parsed.
///
/// Offsets are byte positions into the selector group being parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector (or one of its comma-separated groups) is empty.
    Empty,
    /// A combinator has no compound selector on one of its sides.
    DanglingCombinator(usize),
    /// `.`, `#` or `[` was not followed by an identifier.
    MissingIdentifier(usize),
    /// An attribute selector was not closed with `]`.
    UnterminatedAttribute(usize),
    /// A quoted attribute value was not closed.
    UnterminatedString(usize),
    /// A character that this engine does not understand (pseudo-classes, `|`, ...).
    UnexpectedCharacter { offset: usize, found: char },
}

impl Display for SelectorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::DanglingCombinator(offset) => {
                write!(f, "combinator at offset {offset} has nothing to combine")
            }
            Self::MissingIdentifier(offset) => {
                write!(f, "expected an identifier at offset {offset}")
            }
            Self::UnterminatedAttribute(offset) => {
                write!(f, "attribute selector starting at offset {offset} is not closed")
            }
            Self::UnterminatedString(offset) => {
                write!(f, "quoted value starting at offset {offset} is not closed")
            }
            Self::UnexpectedCharacter { offset, found } => {
                write!(f, "unexpected character {found:?} at offset {offset}")
            }
        }
    }
}

impl Error for SelectorError {}
