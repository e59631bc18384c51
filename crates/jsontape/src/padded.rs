//! Input buffer with a guaranteed safety margin.
//!
//! Stage 2 reads a handful of bytes past the last token when verifying
//! literals and scanning number tails. [`PaddedBytes`] guarantees that
//! [`PADDING`] zeroed bytes follow the logical end of the input, so those
//! reads stay in bounds without per-byte length checks.

use core::ops::Deref;

/// Number of readable bytes guaranteed past the logical end of the input.
pub const PADDING: usize = 64;

/// A byte buffer whose allocation extends [`PADDING`] zeroed bytes past its
/// logical length.
///
/// The padding bytes carry no meaning; they exist so that vectorized and
/// speculative reads never fault. Construction always copies the input into
/// a fresh allocation.
#[derive(Debug, Clone)]
pub struct PaddedBytes {
    buf: Vec<u8>,
    len: usize,
}

impl PaddedBytes {
    /// Copy `bytes` into a freshly padded buffer.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(bytes.len() + PADDING);
        buf.extend_from_slice(bytes);
        buf.resize(bytes.len() + PADDING, 0);
        Self {
            buf,
            len: bytes.len(),
        }
    }

    /// Logical length of the input, excluding padding.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the logical input is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The input without the padding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The input including the trailing padding bytes.
    pub(crate) fn padded(&self) -> &[u8] {
        &self.buf
    }
}

impl Deref for PaddedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<&[u8]> for PaddedBytes {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl From<&str> for PaddedBytes {
    fn from(s: &str) -> Self {
        Self::from_slice(s.as_bytes())
    }
}

impl From<Vec<u8>> for PaddedBytes {
    fn from(mut buf: Vec<u8>) -> Self {
        let len = buf.len();
        buf.resize(len + PADDING, 0);
        Self { buf, len }
    }
}

impl From<String> for PaddedBytes {
    fn from(s: String) -> Self {
        Self::from(s.into_bytes())
    }
}
