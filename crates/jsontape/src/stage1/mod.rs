//! Stage 1: the structural scanner.
//!
//! Walks the input in 64-byte blocks and produces the ordered list of byte
//! offsets stage 2 consumes: every `{ } [ ] : ,`, every opening quote, and
//! the first byte of every number or literal token outside a string. All the
//! per-byte decisions are made on whole-block bitmasks produced by the
//! classification backend; the only state that crosses a block boundary is
//! three carry bits (escape parity, in-string, token adjacency) and the
//! UTF-8 validator's look-behind.
//!
//! The trailing partial block is copied into a stack buffer pre-filled with
//! spaces: space is whitespace under the classifier, so the fill can never
//! fabricate a token start, which zero bytes would.

mod classify;
mod scalar;
mod utf8;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "aarch64")]
mod neon;
#[cfg(target_arch = "x86_64")]
mod sse42;

use classify::{BLOCK, Backend, BlockClass};
use utf8::Utf8State;

use crate::error::{Error, Result};
use crate::padded::PaddedBytes;

/// Name of the classification backend the runtime probe selected.
#[must_use]
pub fn implementation_name() -> &'static str {
    Backend::active().name()
}

/// Scan `input` and fill `structural_indexes` with the byte offset of every
/// structural character and token start, in order.
///
/// # Errors
///
/// [`Error::Utf8`] for invalid UTF-8, [`Error::UnclosedString`] when a
/// string is still open at end of input, [`Error::Empty`] when no token was
/// found at all. UTF-8 errors are detected during the scan but surfaced only
/// after it completes.
pub(crate) fn find_structural_bits(
    input: &PaddedBytes,
    structural_indexes: &mut Vec<u32>,
) -> Result<()> {
    structural_indexes.clear();
    let bytes = input.as_bytes();
    let mut scanner = BlockScanner::new(Backend::active());

    let full = bytes.len() / BLOCK * BLOCK;
    for (i, block) in bytes[..full].chunks_exact(BLOCK).enumerate() {
        scanner.step(i * BLOCK, block, structural_indexes);
    }
    if full < bytes.len() {
        let mut tail = [b' '; BLOCK];
        tail[..bytes.len() - full].copy_from_slice(&bytes[full..]);
        scanner.step(full, &tail, structural_indexes);
    }
    scanner.finish(structural_indexes)
}

/// Carry state threaded from one block to the next.
struct BlockScanner {
    backend: Backend,
    /// 1 when the previous block ended in an odd-length backslash run.
    prev_ends_odd_backslash: u64,
    /// All ones while inside a string, sign-extended from the last bit.
    prev_in_string: u64,
    /// 1 when the previous block ended in a structural or whitespace byte.
    /// Starts at 1 so a scalar at offset zero counts as a token start.
    prev_ends_pseudo_pred: u64,
    utf8: Utf8State,
}

impl BlockScanner {
    fn new(backend: Backend) -> Self {
        Self {
            backend,
            prev_ends_odd_backslash: 0,
            prev_in_string: 0,
            prev_ends_pseudo_pred: 1,
            utf8: Utf8State::new(),
        }
    }

    fn step(&mut self, base: usize, block: &[u8], structural_indexes: &mut Vec<u32>) {
        let class = self.backend.classify(block);
        self.backend.check_utf8(block, class.non_ascii, &mut self.utf8);

        let escaped = self.find_odd_backslash_sequences(class.backslash);
        let quote_bits = class.quote & !escaped;
        // The in-string mask covers the opening quote through the byte
        // before the closing quote.
        let quote_mask = prefix_xor(quote_bits) ^ self.prev_in_string;
        self.prev_in_string = ((quote_mask as i64) >> 63) as u64;

        let structurals = finalize_structurals(
            &class,
            quote_bits,
            quote_mask,
            &mut self.prev_ends_pseudo_pred,
        );
        flatten_bits(structural_indexes, base, structurals);
    }

    fn finish(self, structural_indexes: &[u32]) -> Result<()> {
        if !self.utf8.is_valid() {
            return Err(Error::Utf8);
        }
        if self.prev_in_string != 0 {
            return Err(Error::UnclosedString);
        }
        if structural_indexes.is_empty() {
            return Err(Error::Empty);
        }
        Ok(())
    }

    /// Mask of bytes preceded by an odd-length run of backslashes, i.e. the
    /// escaped characters. One carry bit for runs that straddle blocks.
    fn find_odd_backslash_sequences(&mut self, backslash: u64) -> u64 {
        const EVEN_BITS: u64 = 0x5555_5555_5555_5555;
        const ODD_BITS: u64 = !EVEN_BITS;

        let start_edges = backslash & !(backslash << 1);
        // A run continuing from the previous block flips which starts count
        // as even.
        let even_start_mask = EVEN_BITS ^ self.prev_ends_odd_backslash;
        let even_starts = start_edges & even_start_mask;
        let odd_starts = start_edges & !even_start_mask;

        let even_carries = backslash.wrapping_add(even_starts);
        let (mut odd_carries, ends_odd) = backslash.overflowing_add(odd_starts);
        odd_carries |= self.prev_ends_odd_backslash;
        self.prev_ends_odd_backslash = u64::from(ends_odd);

        let even_carry_ends = even_carries & !backslash;
        let odd_carry_ends = odd_carries & !backslash;
        (even_carry_ends & ODD_BITS) | (odd_carry_ends & EVEN_BITS)
    }
}

/// Merge operators, opening quotes and token starts into the final
/// structural mask for one block.
fn finalize_structurals(
    class: &BlockClass,
    quote_bits: u64,
    quote_mask: u64,
    prev_ends_pseudo_pred: &mut u64,
) -> u64 {
    let mut structurals = class.op & !quote_mask;
    structurals |= quote_bits;

    // A token start is any non-whitespace byte outside a string that
    // follows whitespace or a structural byte.
    let pseudo_pred = structurals | class.whitespace;
    let shifted = (pseudo_pred << 1) | *prev_ends_pseudo_pred;
    *prev_ends_pseudo_pred = pseudo_pred >> 63;
    structurals |= shifted & !class.whitespace & !quote_mask;

    // Closing quotes (quote bits outside the in-string mask) are not token
    // starts.
    structurals & !(quote_bits & !quote_mask)
}

/// XOR-prefix scan: bit `i` of the result is the XOR of bits `0..=i`.
fn prefix_xor(mut bits: u64) -> u64 {
    bits ^= bits << 1;
    bits ^= bits << 2;
    bits ^= bits << 4;
    bits ^= bits << 8;
    bits ^= bits << 16;
    bits ^= bits << 32;
    bits
}

/// Append the position of every set bit, in ascending order.
fn flatten_bits(structural_indexes: &mut Vec<u32>, base: usize, mut bits: u64) {
    let base = base as u32;
    while bits != 0 {
        structural_indexes.push(base + bits.trailing_zeros());
        bits &= bits - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockScanner, classify::Backend, find_structural_bits, prefix_xor};
    use crate::error::Error;
    use crate::padded::PaddedBytes;

    fn scan(input: &str) -> Result<Vec<u32>, Error> {
        let padded = PaddedBytes::from(input);
        let mut indexes = Vec::new();
        find_structural_bits(&padded, &mut indexes)?;
        Ok(indexes)
    }

    #[test]
    fn prefix_xor_toggles_between_set_bits() {
        assert_eq!(prefix_xor(0), 0);
        assert_eq!(prefix_xor(0b1), u64::MAX);
        // quotes at bits 1 and 4: in-string covers bits 1..=3
        assert_eq!(prefix_xor(0b1_0010) & 0xFF, 0b0_1110);
    }

    #[test]
    fn escaped_quotes_do_not_toggle_strings() {
        let mut scanner = BlockScanner::new(Backend::active());
        // \\\" : three backslashes at bits 0..2, so bit 3 is escaped
        let escaped = scanner.find_odd_backslash_sequences(0b0111);
        assert_eq!(escaped, 0b1000);
        // \\ : even run, the following byte is not escaped
        let mut scanner = BlockScanner::new(Backend::active());
        let escaped = scanner.find_odd_backslash_sequences(0b0011);
        assert_eq!(escaped, 0);
    }

    #[test]
    fn backslash_run_carries_across_blocks() {
        let mut scanner = BlockScanner::new(Backend::active());
        // block ends in a single backslash: the next block's first byte is
        // escaped
        let _ = scanner.find_odd_backslash_sequences(1 << 63);
        let escaped = scanner.find_odd_backslash_sequences(0);
        assert_eq!(escaped, 1);
    }

    #[test]
    fn simple_document_offsets() {
        let found = scan(r#"{"key": 42, "arr":[true]}"#).unwrap();
        //                 0123456789012345678901234
        assert_eq!(found, vec![0, 1, 6, 8, 10, 12, 17, 18, 19, 23, 24]);
    }

    #[test]
    fn escaped_quote_stays_inside_string() {
        let found = scan(r#"["a\"b"]"#).unwrap();
        assert_eq!(found, vec![0, 1, 7]);
    }

    #[test]
    fn scalar_at_offset_zero_is_a_token_start() {
        assert_eq!(scan("123").unwrap(), vec![0]);
        assert_eq!(scan("null").unwrap(), vec![0]);
    }

    #[test]
    fn structurals_inside_strings_are_masked() {
        let found = scan(r#""{[,:]}""#).unwrap();
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn long_whitespace_run_crosses_blocks() {
        let input = format!("{}true", " ".repeat(100));
        assert_eq!(scan(&input).unwrap(), vec![100]);
    }

    #[test]
    fn string_straddles_a_block_boundary() {
        let key = "k".repeat(70);
        let input = format!("{{\"{key}\": 1}}");
        let found = scan(&input).unwrap();
        assert_eq!(found, vec![0, 1, 73, 75, 76]);
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        assert_eq!(scan("   \n\t  "), Err(Error::Empty));
    }

    #[test]
    fn unclosed_string_is_reported() {
        assert_eq!(scan(r#"{"a: 1}"#), Err(Error::UnclosedString));
    }

    #[test]
    fn multibyte_sequence_straddles_a_block_boundary() {
        let input = format!("[\"{}😀\"]", "x".repeat(60));
        assert_eq!(scan(&input).unwrap(), vec![0, 1, 67]);

        // A four-byte lead as the last byte of a block, with only ASCII
        // following, leaves the sequence incomplete.
        let mut bytes = format!("[\"{}", "x".repeat(61)).into_bytes();
        bytes.push(0xF0);
        bytes.extend_from_slice(b"xx\"]");
        let padded = PaddedBytes::from_slice(&bytes);
        let mut indexes = Vec::new();
        assert_eq!(
            find_structural_bits(&padded, &mut indexes),
            Err(Error::Utf8)
        );
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let padded = PaddedBytes::from_slice(b"[\"\xC0\xAF\"]");
        let mut indexes = Vec::new();
        assert_eq!(
            find_structural_bits(&padded, &mut indexes),
            Err(Error::Utf8)
        );
    }
}
