//! Typed read-only views over the tape.
//!
//! [`Element`] is a copyable handle to one tape position. The `as_*`
//! accessors check the tag and fail with [`Error::UnexpectedType`] rather
//! than panicking, so lookups chain with `?`. [`Array`] and [`Object`]
//! wrap container elements and iterate in document order.

use crate::error::{Error, Result};
use crate::tape::{Document, TapeType, after_element, tape_payload};

/// A single value on the tape.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    loc: usize,
}

impl<'a> Element<'a> {
    pub(crate) fn new(doc: &'a Document, loc: usize) -> Self {
        Self { doc, loc }
    }

    /// Tag of this element.
    #[must_use]
    pub fn tape_type(&self) -> TapeType {
        TapeType::of(self.doc.tape[self.loc])
    }

    /// Signed integer value.
    ///
    /// # Errors
    ///
    /// [`Error::NumberOutOfRange`] for a `u64` above `i64::MAX`,
    /// [`Error::UnexpectedType`] for anything non-integer.
    pub fn as_i64(&self) -> Result<i64> {
        match self.tape_type() {
            TapeType::Int64 => Ok(self.raw_word() as i64),
            TapeType::Uint64 => {
                i64::try_from(self.raw_word()).map_err(|_| Error::NumberOutOfRange)
            }
            _ => Err(Error::UnexpectedType),
        }
    }

    /// Unsigned integer value.
    ///
    /// # Errors
    ///
    /// [`Error::NumberOutOfRange`] for a negative `i64`,
    /// [`Error::UnexpectedType`] for anything non-integer.
    pub fn as_u64(&self) -> Result<u64> {
        match self.tape_type() {
            TapeType::Uint64 => Ok(self.raw_word()),
            TapeType::Int64 => {
                u64::try_from(self.raw_word() as i64).map_err(|_| Error::NumberOutOfRange)
            }
            _ => Err(Error::UnexpectedType),
        }
    }

    /// Numeric value as a double; integers convert.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedType`] for non-numbers.
    pub fn as_f64(&self) -> Result<f64> {
        match self.tape_type() {
            TapeType::Double => Ok(f64::from_bits(self.raw_word())),
            TapeType::Int64 => Ok(self.raw_word() as i64 as f64),
            TapeType::Uint64 => Ok(self.raw_word() as f64),
            _ => Err(Error::UnexpectedType),
        }
    }

    /// String value.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedType`] for non-strings.
    pub fn as_str(&self) -> Result<&'a str> {
        // The arena only ever holds validated UTF-8.
        std::str::from_utf8(self.as_bytes()?).map_err(|_| Error::Utf8)
    }

    /// Raw unescaped bytes of a string value.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedType`] for non-strings.
    pub fn as_bytes(&self) -> Result<&'a [u8]> {
        match self.tape_type() {
            TapeType::String => {
                let offset = tape_payload(self.doc.tape[self.loc]) as usize;
                Ok(self.doc.string_at(offset))
            }
            _ => Err(Error::UnexpectedType),
        }
    }

    /// Boolean value.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedType`] for non-booleans.
    pub fn as_bool(&self) -> Result<bool> {
        match self.tape_type() {
            TapeType::True => Ok(true),
            TapeType::False => Ok(false),
            _ => Err(Error::UnexpectedType),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.tape_type() == TapeType::Null
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        self.tape_type() == TapeType::StartObject
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.tape_type() == TapeType::StartArray
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        self.tape_type() == TapeType::String
    }

    /// True for both signed and unsigned integer words.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self.tape_type(), TapeType::Int64 | TapeType::Uint64)
    }

    /// True for any numeric word, doubles included.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(
            self.tape_type(),
            TapeType::Int64 | TapeType::Uint64 | TapeType::Double
        )
    }

    #[must_use]
    pub fn is_bool(&self) -> bool {
        matches!(self.tape_type(), TapeType::True | TapeType::False)
    }

    /// View this element as an array.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedType`] when it is not one.
    pub fn get_array(&self) -> Result<Array<'a>> {
        match self.tape_type() {
            TapeType::StartArray => Ok(Array {
                doc: self.doc,
                start: self.loc,
            }),
            _ => Err(Error::UnexpectedType),
        }
    }

    /// View this element as an object.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedType`] when it is not one.
    pub fn get_object(&self) -> Result<Object<'a>> {
        match self.tape_type() {
            TapeType::StartObject => Ok(Object {
                doc: self.doc,
                start: self.loc,
            }),
            _ => Err(Error::UnexpectedType),
        }
    }

    /// Array element by position.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfBounds`] past the end, [`Error::UnexpectedType`]
    /// on non-arrays.
    pub fn at(&self, index: usize) -> Result<Element<'a>> {
        self.get_array()?
            .iter()
            .nth(index)
            .ok_or(Error::IndexOutOfBounds)
    }

    /// Object field by key; the first matching key wins.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchField`] when absent, [`Error::UnexpectedType`] on
    /// non-objects.
    pub fn at_key(&self, key: &str) -> Result<Element<'a>> {
        self.get_object()?
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .ok_or(Error::NoSuchField)
    }

    /// The word after the tag word, holding the bits of a number value.
    fn raw_word(&self) -> u64 {
        self.doc.tape[self.loc + 1]
    }
}

/// An array value on the tape.
#[derive(Debug, Clone, Copy)]
pub struct Array<'a> {
    doc: &'a Document,
    start: usize,
}

impl<'a> Array<'a> {
    #[must_use]
    pub fn iter(&self) -> ArrayIter<'a> {
        ArrayIter {
            doc: self.doc,
            loc: self.start + 1,
            end: tape_payload(self.doc.tape[self.start]) as usize - 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        tape_payload(self.doc.tape[self.start]) as usize == self.start + 2
    }

    /// Element count; walks the tape.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

impl<'a> IntoIterator for Array<'a> {
    type Item = Element<'a>;
    type IntoIter = ArrayIter<'a>;

    fn into_iter(self) -> ArrayIter<'a> {
        self.iter()
    }
}

pub struct ArrayIter<'a> {
    doc: &'a Document,
    loc: usize,
    end: usize,
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Element<'a>> {
        if self.loc >= self.end {
            return None;
        }
        let element = Element::new(self.doc, self.loc);
        self.loc = after_element(&self.doc.tape, self.loc);
        Some(element)
    }
}

/// An object value on the tape.
#[derive(Debug, Clone, Copy)]
pub struct Object<'a> {
    doc: &'a Document,
    start: usize,
}

impl<'a> Object<'a> {
    #[must_use]
    pub fn iter(&self) -> ObjectIter<'a> {
        ObjectIter {
            doc: self.doc,
            loc: self.start + 1,
            end: tape_payload(self.doc.tape[self.start]) as usize - 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        tape_payload(self.doc.tape[self.start]) as usize == self.start + 2
    }

    /// Field count; walks the tape.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

impl<'a> IntoIterator for Object<'a> {
    type Item = (&'a str, Element<'a>);
    type IntoIter = ObjectIter<'a>;

    fn into_iter(self) -> ObjectIter<'a> {
        self.iter()
    }
}

pub struct ObjectIter<'a> {
    doc: &'a Document,
    loc: usize,
    end: usize,
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = (&'a str, Element<'a>);

    fn next(&mut self) -> Option<(&'a str, Element<'a>)> {
        if self.loc >= self.end {
            return None;
        }
        let offset = tape_payload(self.doc.tape[self.loc]) as usize;
        // Key strings come out of the same validated arena as values.
        let key = std::str::from_utf8(self.doc.string_at(offset)).unwrap_or_default();
        let value = Element::new(self.doc, self.loc + 1);
        self.loc = after_element(&self.doc.tape, self.loc + 1);
        Some((key, value))
    }
}
