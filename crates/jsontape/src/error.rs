use thiserror::Error;

/// Everything that can go wrong while parsing or navigating a document.
///
/// Errors are plain values: both parsing stages fail fast with the first
/// applicable kind and never attempt partial recovery. Lookup misses
/// ([`Error::NoSuchField`], [`Error::IndexOutOfBounds`]) are ordinary
/// outcomes callers are expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The document is larger than the parser's allocated capacity.
    #[error("document exceeds the parser's capacity")]
    Capacity,
    /// A buffer allocation failed.
    #[error("memory allocation failed")]
    MemAlloc,
    /// Objects and arrays are nested deeper than the configured limit.
    #[error("nesting exceeds the maximum depth")]
    DepthExceeded,
    /// The input contains an invalid UTF-8 byte sequence.
    #[error("input is not valid UTF-8")]
    Utf8,
    /// The input holds no JSON value at all.
    #[error("empty document")]
    Empty,
    /// A structural token appeared where the grammar does not allow it.
    #[error("unexpected token")]
    Syntax,
    /// Bytes remain after the single top-level value.
    #[error("trailing content after the document")]
    TrailingContent,
    /// A string ran past the end of the input without a closing quote.
    #[error("unterminated string")]
    UnclosedString,
    /// A backslash introduced an unrecognized escape sequence.
    #[error("invalid escape sequence in string")]
    InvalidEscape,
    /// A `\uXXXX` escape held non-hex digits or an unpaired surrogate.
    #[error("invalid unicode escape in string")]
    InvalidUnicodeEscape,
    /// A raw control byte (below 0x20) appeared inside a string.
    #[error("unescaped control character in string")]
    UnescapedControl,
    /// A numeral breaks the JSON number grammar.
    #[error("malformed number")]
    InvalidNumber,
    /// A number cannot be represented, even as a double.
    #[error("number out of range")]
    NumberOutOfRange,
    /// `true`, `false` or `null` was spelled incorrectly.
    #[error("misspelled literal")]
    InvalidLiteral,
    /// The requested object key does not exist.
    #[error("no field with the requested key")]
    NoSuchField,
    /// The requested array index is past the end of the array.
    #[error("array index out of bounds")]
    IndexOutOfBounds,
    /// A typed accessor was called on a value of a different type.
    #[error("value has an unexpected type")]
    UnexpectedType,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
