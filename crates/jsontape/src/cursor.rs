//! Manual tape navigation.
//!
//! [`TapeCursor`] walks the tape directly: sideways with [`next`] and
//! [`prev`], into containers with [`down`] and back out with [`up`]. The
//! movement methods return `false` and stay put when the move is not
//! possible, so probing never invalidates the cursor. The typed accessors
//! go through [`Element`], which carries the error reporting.
//!
//! [`next`]: TapeCursor::next
//! [`prev`]: TapeCursor::prev
//! [`down`]: TapeCursor::down
//! [`up`]: TapeCursor::up

use crate::dom::Element;
use crate::error::Result;
use crate::tape::{Document, TapeType, after_element, tape_payload};

/// A stateful position on a document's tape.
#[derive(Debug, Clone)]
pub struct TapeCursor<'a> {
    doc: &'a Document,
    loc: usize,
    /// Start words of the containers entered so far.
    scopes: Vec<usize>,
}

impl<'a> TapeCursor<'a> {
    pub(crate) fn new(doc: &'a Document) -> Self {
        // The root value sits right after the leading sentinel.
        Self {
            doc,
            loc: 1,
            scopes: Vec::new(),
        }
    }

    /// Tag of the element under the cursor.
    #[must_use]
    pub fn tape_type(&self) -> TapeType {
        TapeType::of(self.doc.tape[self.loc])
    }

    /// The element under the cursor, for typed access.
    #[must_use]
    pub fn element(&self) -> Element<'a> {
        Element::new(self.doc, self.loc)
    }

    /// Enter the container under the cursor, landing on its first element
    /// (the first key for objects). `false` on scalars and on empty
    /// containers.
    pub fn down(&mut self) -> bool {
        match self.tape_type() {
            TapeType::StartArray | TapeType::StartObject => {}
            _ => return false,
        }
        // An empty container's end word sits immediately after the start.
        if tape_payload(self.doc.tape[self.loc]) as usize == self.loc + 2 {
            return false;
        }
        self.scopes.push(self.loc);
        self.loc += 1;
        true
    }

    /// Leave the current container, landing back on its start word.
    /// `false` at root level.
    pub fn up(&mut self) -> bool {
        match self.scopes.pop() {
            Some(start) => {
                self.loc = start;
                true
            }
            None => false,
        }
    }

    /// Step to the next sibling. `false` on the last element of a
    /// container and on the root value.
    pub fn next(&mut self) -> bool {
        let candidate = after_element(&self.doc.tape, self.loc);
        match TapeType::of(self.doc.tape[candidate]) {
            TapeType::EndArray | TapeType::EndObject | TapeType::Root => false,
            _ => {
                self.loc = candidate;
                true
            }
        }
    }

    /// Step to the previous sibling by rescanning from the front of the
    /// container. `false` on a first element and on the root value.
    pub fn prev(&mut self) -> bool {
        let Some(&scope) = self.scopes.last() else {
            return false;
        };
        let first = scope + 1;
        if self.loc == first {
            return false;
        }
        let mut probe = first;
        loop {
            let next = after_element(&self.doc.tape, probe);
            if next == self.loc {
                self.loc = probe;
                return true;
            }
            probe = next;
        }
    }

    /// From a key position inside an object, scan forward for `key` and
    /// land on its value. The first matching key wins. On a miss the
    /// cursor is left where it was.
    pub fn move_to_key(&mut self, key: &str) -> bool {
        let saved = self.loc;
        while self.tape_type() == TapeType::String {
            let offset = tape_payload(self.doc.tape[self.loc]) as usize;
            if self.doc.string_at(offset) == key.as_bytes() {
                // The value follows the one-word key.
                self.loc += 1;
                return true;
            }
            let value = self.loc + 1;
            let next = after_element(&self.doc.tape, value);
            match TapeType::of(self.doc.tape[next]) {
                TapeType::EndObject | TapeType::EndArray | TapeType::Root => break,
                _ => self.loc = next,
            }
        }
        self.loc = saved;
        false
    }

    /// Shorthand for [`Element::as_str`] on the current element.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnexpectedType`] when the element is not a string.
    pub fn as_str(&self) -> Result<&'a str> {
        self.element().as_str()
    }

    /// Shorthand for [`Element::as_i64`] on the current element.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnexpectedType`] for non-integers,
    /// [`crate::Error::NumberOutOfRange`] for `u64` values past `i64::MAX`.
    pub fn as_i64(&self) -> Result<i64> {
        self.element().as_i64()
    }

    /// Shorthand for [`Element::as_f64`] on the current element.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnexpectedType`] when the element is not numeric.
    pub fn as_f64(&self) -> Result<f64> {
        self.element().as_f64()
    }

    /// Shorthand for [`Element::as_bool`] on the current element.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnexpectedType`] when the element is not a boolean.
    pub fn as_bool(&self) -> Result<bool> {
        self.element().as_bool()
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.element().is_null()
    }
}
