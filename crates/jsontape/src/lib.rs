//! A two-stage JSON parser that turns a document into a flat tape.
//!
//! Stage 1 scans the raw bytes in 64-byte blocks with whatever SIMD the CPU
//! offers and records the offset of every structural character and token
//! start. Stage 2 replays those offsets through a state machine and writes
//! one 64-bit word per element onto a tape, with container start and end
//! words pointing at each other so navigation never re-reads the input.
//!
//! Inputs are handed over as [`PaddedBytes`], which guarantees the scanner
//! can always read a full block. A [`Parser`] is reusable and keeps its
//! buffers between documents:
//!
//! ```
//! use jsontape::Parser;
//!
//! let mut parser = Parser::new();
//! let doc = parser.parse(&r#"{"ids": [3, 5, 8]}"#.into())?;
//! let ids = doc.root().at_key("ids")?;
//! assert_eq!(ids.at(1)?.as_i64()?, 5);
//! # Ok::<(), jsontape::Error>(())
//! ```
//!
//! Navigation comes in two flavors: the typed [`Element`] / [`Array`] /
//! [`Object`] views, and the manual [`TapeCursor`] for code that wants to
//! steer itself.

mod cursor;
mod dom;
mod error;
mod padded;
mod parser;
mod stage1;
mod stage2;
mod tape;

#[cfg(test)]
mod tests;

pub use cursor::TapeCursor;
pub use dom::{Array, ArrayIter, Element, Object, ObjectIter};
pub use error::{Error, Result};
pub use padded::{PADDING, PaddedBytes};
pub use parser::{DEFAULT_MAX_DEPTH, Parser, parse};
pub use stage1::implementation_name;
pub use tape::{Document, TapeType};
