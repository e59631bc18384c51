//! The tape: a flat, append-only encoding of a parsed document.
//!
//! Each tape word is a `u64` whose top byte is an ASCII type tag and whose
//! low 56 bits are the payload. Containers cross-reference each other by
//! tape offset: a `start_*` word's payload is the offset one past its
//! matching `end_*` word, and the end word's payload is the offset of the
//! start word, so skipping over a container is O(1). The tape opens with a
//! [`TapeType::Root`] sentinel whose payload is the tape length and closes
//! with a `Root` sentinel whose payload is 0, the offset of the opener.
//!
//! All cross-references are integer offsets into the same two flat arrays
//! (tape and string arena), never addresses, so a document is trivially
//! relocatable.

use core::fmt;

use bstr::BStr;

use crate::cursor::TapeCursor;
use crate::dom::Element;

/// Type tag stored in the top byte of every tape word.
///
/// The tag values are the ASCII characters the original wire-debug format
/// uses, which makes a raw tape legible in a hex dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TapeType {
    /// Sentinel at both ends of the tape.
    Root = b'r',
    /// `[`; payload points one past the matching `EndArray`.
    StartArray = b'[',
    /// `{`; payload points one past the matching `EndObject`.
    StartObject = b'{',
    /// `]`; payload points at the matching `StartArray`.
    EndArray = b']',
    /// `}`; payload points at the matching `StartObject`.
    EndObject = b'}',
    /// String; payload is an offset into the string arena.
    String = b'"',
    /// Signed 64-bit integer; the following word holds the value bits.
    Int64 = b'l',
    /// Unsigned 64-bit integer; the following word holds the value bits.
    Uint64 = b'u',
    /// Double; the following word holds the `f64` bits.
    Double = b'd',
    /// Literal `true`.
    True = b't',
    /// Literal `false`.
    False = b'f',
    /// Literal `null`.
    Null = b'n',
}

impl TapeType {
    /// Decode the tag byte of a tape word.
    ///
    /// Tape words are only ever written by the builder, so the tag is always
    /// one of the known values; an unknown byte can only mean a corrupted
    /// word and maps to `Root`, which every consumer treats as a stop.
    pub(crate) fn of(word: u64) -> TapeType {
        match (word >> 56) as u8 {
            b'[' => TapeType::StartArray,
            b'{' => TapeType::StartObject,
            b']' => TapeType::EndArray,
            b'}' => TapeType::EndObject,
            b'"' => TapeType::String,
            b'l' => TapeType::Int64,
            b'u' => TapeType::Uint64,
            b'd' => TapeType::Double,
            b't' => TapeType::True,
            b'f' => TapeType::False,
            b'n' => TapeType::Null,
            other => {
                debug_assert_eq!(other, b'r', "corrupted tape word");
                TapeType::Root
            }
        }
    }
}

pub(crate) const PAYLOAD_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Pack a tag and payload into one tape word.
pub(crate) fn tape_word(tag: TapeType, payload: u64) -> u64 {
    debug_assert_eq!(payload & !PAYLOAD_MASK, 0, "payload overflows 56 bits");
    ((tag as u64) << 56) | (payload & PAYLOAD_MASK)
}

/// The 56-bit payload of a tape word.
pub(crate) fn tape_payload(word: u64) -> u64 {
    word & PAYLOAD_MASK
}

/// Tape offset one past the element starting at `loc`.
///
/// Containers jump via their start payload; numbers span two words; every
/// other element spans one.
pub(crate) fn after_element(tape: &[u64], loc: usize) -> usize {
    match TapeType::of(tape[loc]) {
        TapeType::StartArray | TapeType::StartObject => tape_payload(tape[loc]) as usize,
        TapeType::Int64 | TapeType::Uint64 | TapeType::Double => loc + 2,
        _ => loc + 1,
    }
}

/// A parsed JSON document: tape words plus the unescaped string arena.
///
/// A `Document` produced by [`Parser::parse`](crate::Parser::parse) borrows
/// the parser's buffers; it is overwritten by the next parse on the same
/// parser. [`Parser::parse_owned`](crate::Parser::parse_owned) moves the
/// buffers out instead.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Document {
    pub(crate) tape: Vec<u64>,
    pub(crate) strings: Vec<u8>,
}

impl Document {
    /// The single top-level value.
    #[must_use]
    pub fn root(&self) -> Element<'_> {
        Element::new(self, 1)
    }

    /// A cursor positioned at the top-level value.
    #[must_use]
    pub fn cursor(&self) -> TapeCursor<'_> {
        TapeCursor::new(self)
    }

    /// Number of words on the tape, sentinels included.
    #[must_use]
    pub fn tape_len(&self) -> usize {
        self.tape.len()
    }

    pub(crate) fn clear(&mut self) {
        self.tape.clear();
        self.strings.clear();
    }

    /// The unescaped bytes of the string stored at `offset` in the arena.
    ///
    /// Arena layout: a little-endian `u32` length prefix followed by the
    /// string bytes.
    pub(crate) fn string_at(&self, offset: usize) -> &[u8] {
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&self.strings[offset..offset + 4]);
        let len = u32::from_le_bytes(prefix) as usize;
        &self.strings[offset + 4..offset + 4 + len]
    }

    /// Write one line per tape word to `out`, in the original debug format.
    ///
    /// # Errors
    ///
    /// Propagates formatter errors from `out`.
    pub fn dump_raw_tape(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let mut loc = 0;
        while loc < self.tape.len() {
            let word = self.tape[loc];
            let payload = tape_payload(word);
            write!(out, "{loc} : ")?;
            match TapeType::of(word) {
                TapeType::Root => writeln!(out, "r\t// pointing to {payload}")?,
                TapeType::StartArray => writeln!(out, "[\t// pointing to next tape location {payload}")?,
                TapeType::EndArray => writeln!(out, "]\t// pointing to previous tape location {payload}")?,
                TapeType::StartObject => writeln!(out, "{{\t// pointing to next tape location {payload}")?,
                TapeType::EndObject => writeln!(out, "}}\t// pointing to previous tape location {payload}")?,
                TapeType::String => {
                    let s = BStr::new(self.string_at(payload as usize));
                    writeln!(out, "string \"{s}\"")?;
                }
                TapeType::Int64 => {
                    loc += 1;
                    writeln!(out, "integer {}", self.tape[loc] as i64)?;
                }
                TapeType::Uint64 => {
                    loc += 1;
                    writeln!(out, "unsigned integer {}", self.tape[loc])?;
                }
                TapeType::Double => {
                    loc += 1;
                    writeln!(out, "float {}", f64::from_bits(self.tape[loc]))?;
                }
                TapeType::True => writeln!(out, "true")?,
                TapeType::False => writeln!(out, "false")?,
                TapeType::Null => writeln!(out, "null")?,
            }
            loc += 1;
        }
        Ok(())
    }
}
