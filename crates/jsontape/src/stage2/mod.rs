//! Stage 2: the tape builder.
//!
//! Replays the structural indexes stage 1 produced through a small state
//! machine and appends one tape word per element. Container start words are
//! left as placeholders and patched when the matching close is seen, so the
//! tape is written strictly left to right with a single pass over the
//! indexes.

pub(crate) mod numbers;
mod strings;

use numbers::{ParsedNumber, is_token_boundary, parse_number};
use strings::parse_string;

use crate::error::{Error, Result};
use crate::padded::PaddedBytes;
use crate::tape::{Document, TapeType, tape_word};

/// Run stage 2 over `indexes`, filling `doc`'s tape and string arena.
pub(crate) fn build_tape(
    input: &PaddedBytes,
    indexes: &[u32],
    max_depth: usize,
    doc: &mut Document,
) -> Result<()> {
    doc.clear();
    TapeBuilder {
        src: input.padded(),
        len: input.len(),
        indexes,
        pos: 0,
        tape: &mut doc.tape,
        strings: &mut doc.strings,
        stack: Vec::new(),
        max_depth,
    }
    .build()
}

/// Tape positions are stored in the 32-bit payload of start and end words;
/// a tape that outgrows them is past the supported document size.
fn tape_offset(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::Capacity)
}

#[derive(Clone, Copy, PartialEq)]
enum ScopeKind {
    Object,
    Array,
}

/// An open container: where its start word sits on the tape, and which
/// close byte it expects.
struct Scope {
    tape_start: u32,
    kind: ScopeKind,
}

#[derive(Clone, Copy)]
enum State {
    /// Inside an object, first token after `{`: a key or `}`.
    ObjectBegin,
    /// Inside an object, after a value: `,` or `}`.
    ObjectContinue,
    /// Inside an array, first token after `[`: a value or `]`.
    ArrayBegin,
    /// Inside an array, after a value: `,` or `]`.
    ArrayContinue,
    /// Root value complete; only end of input may follow.
    DocumentEnd,
}

struct TapeBuilder<'a> {
    /// Padded input; reads past `len` hit zero bytes, never out of bounds.
    src: &'a [u8],
    len: usize,
    indexes: &'a [u32],
    pos: usize,
    tape: &'a mut Vec<u64>,
    strings: &'a mut Vec<u8>,
    stack: Vec<Scope>,
    max_depth: usize,
}

impl TapeBuilder<'_> {
    fn build(mut self) -> Result<()> {
        // Placeholder for the root word, patched at the end.
        self.tape.push(0);

        let idx = self.token()?;
        let mut state = self.value(idx, State::DocumentEnd)?;
        loop {
            state = match state {
                State::ObjectBegin => self.object_begin()?,
                State::ObjectContinue => self.object_continue()?,
                State::ArrayBegin => self.array_begin()?,
                State::ArrayContinue => self.array_continue()?,
                State::DocumentEnd => break,
            };
        }
        if self.pos != self.indexes.len() {
            return Err(Error::TrailingContent);
        }

        self.tape.push(tape_word(TapeType::Root, 0));
        self.tape[0] = tape_word(TapeType::Root, self.tape.len() as u64);
        Ok(())
    }

    /// Next structural index; running out mid-document is a syntax error.
    fn token(&mut self) -> Result<usize> {
        let idx = *self.indexes.get(self.pos).ok_or(Error::Syntax)?;
        self.pos += 1;
        Ok(idx as usize)
    }

    /// Handle the value whose token starts at `idx`. Containers push a
    /// scope and descend; scalars complete immediately and return
    /// `after_scalar`.
    fn value(&mut self, idx: usize, after_scalar: State) -> Result<State> {
        match self.src[idx] {
            b'{' => {
                self.begin_scope(ScopeKind::Object)?;
                Ok(State::ObjectBegin)
            }
            b'[' => {
                self.begin_scope(ScopeKind::Array)?;
                Ok(State::ArrayBegin)
            }
            _ => {
                self.scalar(idx)?;
                Ok(after_scalar)
            }
        }
    }

    fn object_begin(&mut self) -> Result<State> {
        let idx = self.token()?;
        match self.src[idx] {
            b'}' => Ok(self.end_scope()),
            b'"' => self.field(idx),
            _ => Err(Error::Syntax),
        }
    }

    fn object_continue(&mut self) -> Result<State> {
        let idx = self.token()?;
        match self.src[idx] {
            b'}' => Ok(self.end_scope()),
            b',' => {
                let key = self.token()?;
                if self.src[key] != b'"' {
                    return Err(Error::Syntax);
                }
                self.field(key)
            }
            _ => Err(Error::Syntax),
        }
    }

    /// Key string at `key`, then a `:` and the field's value.
    fn field(&mut self, key: usize) -> Result<State> {
        let offset = parse_string(self.src, self.len, key, self.strings)?;
        self.tape
            .push(tape_word(TapeType::String, u64::from(offset)));
        let colon = self.token()?;
        if self.src[colon] != b':' {
            return Err(Error::Syntax);
        }
        let idx = self.token()?;
        self.value(idx, State::ObjectContinue)
    }

    fn array_begin(&mut self) -> Result<State> {
        let idx = self.token()?;
        if self.src[idx] == b']' {
            return Ok(self.end_scope());
        }
        self.value(idx, State::ArrayContinue)
    }

    fn array_continue(&mut self) -> Result<State> {
        let idx = self.token()?;
        match self.src[idx] {
            b']' => Ok(self.end_scope()),
            b',' => {
                let idx = self.token()?;
                self.value(idx, State::ArrayContinue)
            }
            _ => Err(Error::Syntax),
        }
    }

    fn begin_scope(&mut self, kind: ScopeKind) -> Result<()> {
        if self.stack.len() == self.max_depth {
            return Err(Error::DepthExceeded);
        }
        self.stack.push(Scope {
            tape_start: tape_offset(self.tape.len())?,
            kind,
        });
        self.tape.push(0);
        Ok(())
    }

    /// Close the innermost scope: write the end word, patch the start word
    /// to point one past it, and resume in the enclosing container.
    fn end_scope(&mut self) -> State {
        // Scopes are only opened by `value`, so the stack cannot be empty
        // when a close byte reaches a container state.
        let Some(scope) = self.stack.pop() else {
            return State::DocumentEnd;
        };
        let (start_tag, end_tag) = match scope.kind {
            ScopeKind::Object => (TapeType::StartObject, TapeType::EndObject),
            ScopeKind::Array => (TapeType::StartArray, TapeType::EndArray),
        };
        self.tape
            .push(tape_word(end_tag, u64::from(scope.tape_start)));
        let one_past_end = self.tape.len() as u64;
        self.tape[scope.tape_start as usize] = tape_word(start_tag, one_past_end);

        match self.stack.last() {
            None => State::DocumentEnd,
            Some(scope) if scope.kind == ScopeKind::Object => State::ObjectContinue,
            Some(_) => State::ArrayContinue,
        }
    }

    fn scalar(&mut self, idx: usize) -> Result<()> {
        match self.src[idx] {
            b'"' => {
                let offset = parse_string(self.src, self.len, idx, self.strings)?;
                self.tape
                    .push(tape_word(TapeType::String, u64::from(offset)));
            }
            b't' => {
                self.atom(idx, b"true")?;
                self.tape.push(tape_word(TapeType::True, 0));
            }
            b'f' => {
                self.atom(idx, b"false")?;
                self.tape.push(tape_word(TapeType::False, 0));
            }
            b'n' => {
                self.atom(idx, b"null")?;
                self.tape.push(tape_word(TapeType::Null, 0));
            }
            b'-' | b'0'..=b'9' => match parse_number(self.src, idx)? {
                ParsedNumber::Int64(v) => {
                    self.tape.push(tape_word(TapeType::Int64, 0));
                    self.tape.push(v as u64);
                }
                ParsedNumber::Uint64(v) => {
                    self.tape.push(tape_word(TapeType::Uint64, 0));
                    self.tape.push(v);
                }
                ParsedNumber::Double(v) => {
                    self.tape.push(tape_word(TapeType::Double, 0));
                    self.tape.push(v.to_bits());
                }
            },
            _ => return Err(Error::Syntax),
        }
        Ok(())
    }

    /// `true`, `false` and `null` must match exactly and end at a token
    /// boundary.
    fn atom(&self, idx: usize, expected: &'static [u8]) -> Result<()> {
        if &self.src[idx..idx + expected.len()] != expected
            || !is_token_boundary(self.src[idx + expected.len()])
        {
            return Err(Error::InvalidLiteral);
        }
        Ok(())
    }
}
