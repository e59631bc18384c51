//! The reusable parser.
//!
//! A [`Parser`] owns the structural index buffer and the [`Document`] the
//! tape is built into, so parsing a stream of inputs of similar size does
//! no allocation after the first document. Capacity grows on demand unless
//! it was pinned with [`Parser::allocate`], in which case larger inputs are
//! refused.

use crate::error::{Error, Result};
use crate::padded::PaddedBytes;
use crate::stage1::find_structural_bits;
use crate::stage2::build_tape;
use crate::tape::Document;

/// Deepest container nesting accepted by default.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// A reusable two-stage JSON parser.
///
/// ```
/// use jsontape::Parser;
///
/// let mut parser = Parser::new();
/// let doc = parser.parse(&r#"{"answer": 42}"#.into())?;
/// assert_eq!(doc.root().at_key("answer")?.as_i64()?, 42);
/// # Ok::<(), jsontape::Error>(())
/// ```
#[derive(Debug)]
pub struct Parser {
    structural_indexes: Vec<u32>,
    doc: Document,
    /// Largest input length accepted without growing, once pinned.
    capacity: Option<usize>,
    max_depth: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// A parser with no reserved capacity and the default depth limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            structural_indexes: Vec::new(),
            doc: Document::default(),
            capacity: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// A parser that rejects documents nested deeper than `max_depth`.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::new()
        }
    }

    /// Reserve buffers for inputs up to `capacity` bytes and pin that
    /// limit: afterwards, longer inputs fail with [`Error::Capacity`]
    /// instead of growing.
    ///
    /// # Errors
    ///
    /// [`Error::MemAlloc`] when the reservation fails.
    pub fn allocate(&mut self, capacity: usize) -> Result<()> {
        // Every byte can be structural, and the tape adds two sentinel
        // words.
        self.structural_indexes
            .try_reserve(capacity)
            .map_err(|_| Error::MemAlloc)?;
        self.doc
            .tape
            .try_reserve(capacity + 2)
            .map_err(|_| Error::MemAlloc)?;
        self.doc
            .strings
            .try_reserve(capacity)
            .map_err(|_| Error::MemAlloc)?;
        self.capacity = Some(capacity);
        Ok(())
    }

    /// The pinned capacity, if [`Parser::allocate`] was called.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse `input` into a tape. The document borrows the parser and is
    /// valid until the next parse.
    ///
    /// # Errors
    ///
    /// Any stage 1 or stage 2 failure; [`Error::Capacity`] when the input
    /// exceeds a pinned capacity or `u32::MAX` bytes.
    pub fn parse(&mut self, input: &PaddedBytes) -> Result<&Document> {
        if self.capacity.is_some_and(|capacity| input.len() > capacity) {
            return Err(Error::Capacity);
        }
        // Structural offsets and string arena offsets are u32.
        if input.len() > u32::MAX as usize {
            return Err(Error::Capacity);
        }
        find_structural_bits(input, &mut self.structural_indexes)?;
        build_tape(input, &self.structural_indexes, self.max_depth, &mut self.doc)?;
        Ok(&self.doc)
    }

    /// Like [`Parser::parse`], but moves the finished document out, leaving
    /// the parser with fresh buffers.
    ///
    /// # Errors
    ///
    /// Same as [`Parser::parse`].
    pub fn parse_owned(&mut self, input: &PaddedBytes) -> Result<Document> {
        self.parse(input)?;
        Ok(std::mem::take(&mut self.doc))
    }
}

/// One-shot convenience wrapper around a throwaway [`Parser`].
///
/// # Errors
///
/// Same as [`Parser::parse`].
pub fn parse(input: &PaddedBytes) -> Result<Document> {
    Parser::new().parse_owned(input)
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_MAX_DEPTH, Parser, parse};
    use crate::error::Error;
    use crate::padded::PaddedBytes;

    #[test]
    fn parser_is_reusable() {
        let mut parser = Parser::new();
        let len_a = parser.parse(&"[1, 2, 3]".into()).unwrap().tape_len();
        let len_b = parser.parse(&"true".into()).unwrap().tape_len();
        assert!(len_a > len_b);
        // The second document fully replaced the first.
        assert!(parser.parse(&"true".into()).unwrap().root().as_bool().is_ok());
    }

    #[test]
    fn defaults() {
        let parser = Parser::new();
        assert_eq!(parser.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(parser.capacity(), None);
    }

    #[test]
    fn pinned_capacity_rejects_longer_inputs() {
        let mut parser = Parser::new();
        parser.allocate(4).unwrap();
        assert!(parser.parse(&"[1]".into()).is_ok());
        assert_eq!(
            parser.parse(&"[1, 2]".into()).unwrap_err(),
            Error::Capacity
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse(&"".into()).unwrap_err(), Error::Empty);
        assert_eq!(parse(&"  ".into()).unwrap_err(), Error::Empty);
    }

    #[test]
    fn owned_document_outlives_the_parser() {
        let doc = {
            let mut parser = Parser::new();
            parser.parse_owned(&r#"{"k": [null]}"#.into()).unwrap()
        };
        assert!(doc.root().at_key("k").unwrap().at(0).unwrap().is_null());
    }

    #[test]
    fn shallow_depth_limit() {
        let mut parser = Parser::with_max_depth(2);
        assert!(parser.parse(&"[[1]]".into()).is_ok());
        assert_eq!(
            parser.parse(&"[[[1]]]".into()).unwrap_err(),
            Error::DepthExceeded
        );
    }
}
