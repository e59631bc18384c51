//! Incremental UTF-8 validation.
//!
//! Validation is a backend operation, like classification. The vector
//! backends run a nibble-lookup continuation check over the same 16-byte
//! lanes: each byte is judged against its predecessor through three table
//! lookups, and the second and third continuations of longer sequences are
//! cross-checked by shifting the lane against the previous one. The scalar
//! backend steps a byte-wise range automaton instead, and doubles as the
//! baseline the vector kernels are tested against.
//!
//! Both paths share [`Utf8State`]: pure ASCII blocks are dismissed in O(1)
//! using the classifier's `non_ascii` mask, a sequence split across blocks
//! carries into the next call, and a failure is latched rather than
//! aborting the scan. Stage 1 finishes its classification pass and reports
//! the error afterwards.

use super::classify::BLOCK;

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
pub(super) use lookup::{BYTE_1_HIGH, BYTE_1_LOW, BYTE_2_HIGH};
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
use lookup::tail_incomplete;

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
mod lookup {
    //! Error-class tables for the vector kernels.
    //!
    //! Every malformed two-byte pattern gets a bit. For a pair of adjacent
    //! bytes, the classes of the first byte's high and low nibble and of
    //! the second byte's high nibble are ANDed; a surviving bit names the
    //! pattern the pair exhibits. A legal continuation pair leaves exactly
    //! `TWO_CONTS` (`0x80`), which the caller cancels against the
    //! positions where a second or third continuation is actually owed.

    /// Lead byte not followed by a continuation.
    const TOO_SHORT: u8 = 1 << 0;
    /// Continuation following an ASCII byte.
    const TOO_LONG: u8 = 1 << 1;
    /// `E0` with a continuation below `A0`.
    const OVERLONG_3: u8 = 1 << 2;
    /// `F4` with a continuation of `90` or above.
    const TOO_LARGE: u8 = 1 << 3;
    /// `ED` with a continuation of `A0` or above.
    const SURROGATE: u8 = 1 << 4;
    /// `C0` or `C1` lead.
    const OVERLONG_2: u8 = 1 << 5;
    /// `F5` and up: past U+10FFFF no matter the continuation.
    const TOO_LARGE_1000: u8 = 1 << 6;
    /// `F0` with a continuation below `90`. Shares a bit with
    /// `TOO_LARGE_1000`; the two patterns need disjoint second bytes.
    const OVERLONG_4: u8 = 1 << 6;
    /// Two continuation bytes in a row.
    const TWO_CONTS: u8 = 1 << 7;
    /// Applies regardless of the first byte's low nibble.
    const CARRY: u8 = TOO_SHORT | TOO_LONG | TWO_CONTS;

    /// Classes of the first byte of a pair, by its high nibble.
    pub(in crate::stage1) const BYTE_1_HIGH: [u8; 16] = [
        TOO_LONG,
        TOO_LONG,
        TOO_LONG,
        TOO_LONG,
        TOO_LONG,
        TOO_LONG,
        TOO_LONG,
        TOO_LONG,
        TWO_CONTS,
        TWO_CONTS,
        TWO_CONTS,
        TWO_CONTS,
        TOO_SHORT | OVERLONG_2,
        TOO_SHORT,
        TOO_SHORT | OVERLONG_3 | SURROGATE,
        TOO_SHORT | TOO_LARGE | TOO_LARGE_1000 | OVERLONG_4,
    ];

    /// Classes of the first byte of a pair, by its low nibble.
    pub(in crate::stage1) const BYTE_1_LOW: [u8; 16] = [
        CARRY | OVERLONG_3 | OVERLONG_2 | OVERLONG_4,
        CARRY | OVERLONG_2,
        CARRY,
        CARRY,
        CARRY | TOO_LARGE,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000 | SURROGATE,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
        CARRY | TOO_LARGE | TOO_LARGE_1000,
    ];

    /// Classes of the second byte of a pair, by its high nibble.
    pub(in crate::stage1) const BYTE_2_HIGH: [u8; 16] = [
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
        TOO_LONG | OVERLONG_2 | TWO_CONTS | OVERLONG_3 | TOO_LARGE_1000 | OVERLONG_4,
        TOO_LONG | OVERLONG_2 | TWO_CONTS | OVERLONG_3 | TOO_LARGE,
        TOO_LONG | OVERLONG_2 | TWO_CONTS | SURROGATE | TOO_LARGE,
        TOO_LONG | OVERLONG_2 | TWO_CONTS | SURROGATE | TOO_LARGE,
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
        TOO_SHORT,
    ];

    /// Whether a block ending in these three bytes leaves a sequence open.
    pub(in crate::stage1) fn tail_incomplete(tail: &[u8]) -> bool {
        tail[2] >= 0xC0 || tail[1] >= 0xE0 || tail[0] >= 0xF0
    }
}

/// Carry state for the validator: one block of look-behind plus the
/// latched result.
#[derive(Debug)]
pub(crate) struct Utf8State {
    /// Latched on the first malformed block.
    error: bool,
    /// Whether the previous block ended inside a multi-byte sequence.
    incomplete: bool,
    /// Last 16 bytes of the previous block; the vector kernels shift the
    /// current lane against this window to line each byte up with its
    /// predecessors.
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    prev: [u8; 16],
    /// Scalar automaton: continuation bytes still owed, and the permitted
    /// range for the next one. Only the first continuation of a sequence
    /// is constrained beyond `0x80..=0xBF`.
    remaining: u8,
    next_lo: u8,
    next_hi: u8,
}

impl Utf8State {
    pub(crate) fn new() -> Self {
        Self {
            error: false,
            incomplete: false,
            #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
            prev: [0; 16],
            remaining: 0,
            next_lo: 0x80,
            next_hi: 0xBF,
        }
    }

    /// Whether everything seen so far forms complete, valid UTF-8.
    pub(crate) fn is_valid(&self) -> bool {
        !self.error && !self.incomplete && self.remaining == 0
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    pub(super) fn failed(&self) -> bool {
        self.error
    }

    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    pub(super) fn prev_lane(&self) -> [u8; 16] {
        self.prev
    }

    /// ASCII-only block: nothing to check, but a sequence the previous
    /// block left open can no longer be completed.
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    pub(super) fn skip_ascii_block(&mut self, block: &[u8]) {
        if self.incomplete {
            self.error = true;
        }
        self.incomplete = false;
        self.prev.copy_from_slice(&block[BLOCK - 16..BLOCK]);
    }

    /// Record one vector-checked block: latch any lane error and roll the
    /// look-behind window forward.
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    pub(super) fn advance_block(&mut self, block: &[u8], lane_error: bool) {
        if lane_error {
            self.error = true;
        }
        self.incomplete = tail_incomplete(&block[BLOCK - 3..BLOCK]);
        self.prev.copy_from_slice(&block[BLOCK - 16..BLOCK]);
    }

    /// The scalar backend's kernel: a range automaton that rejects
    /// overlong forms, surrogates and code points above U+10FFFF, not just
    /// stray continuation bytes.
    pub(super) fn check_block_scalar(&mut self, block: &[u8], non_ascii: u64) {
        if self.error || (non_ascii == 0 && self.remaining == 0) {
            return;
        }
        for &b in &block[..BLOCK] {
            self.step(b);
            if self.error {
                return;
            }
        }
    }

    fn step(&mut self, b: u8) {
        if self.remaining > 0 {
            if b < self.next_lo || b > self.next_hi {
                self.error = true;
                return;
            }
            self.remaining -= 1;
            self.next_lo = 0x80;
            self.next_hi = 0xBF;
            return;
        }
        // Lead byte. The constrained ranges fence off overlong encodings
        // (E0, F0), surrogates (ED) and code points past U+10FFFF (F4).
        match b {
            0x00..=0x7F => {}
            0xC2..=0xDF => self.expect(1, 0x80, 0xBF),
            0xE0 => self.expect(2, 0xA0, 0xBF),
            0xE1..=0xEC | 0xEE..=0xEF => self.expect(2, 0x80, 0xBF),
            0xED => self.expect(2, 0x80, 0x9F),
            0xF0 => self.expect(3, 0x90, 0xBF),
            0xF1..=0xF3 => self.expect(3, 0x80, 0xBF),
            0xF4 => self.expect(3, 0x80, 0x8F),
            _ => self.error = true,
        }
    }

    fn expect(&mut self, count: u8, lo: u8, hi: u8) {
        self.remaining = count;
        self.next_lo = lo;
        self.next_hi = hi;
    }
}

#[cfg(test)]
mod tests {
    use super::super::classify::{BLOCK, Backend};
    use super::super::scalar;
    use super::Utf8State;

    fn run(backend: Backend, bytes: &[u8]) -> bool {
        let mut state = Utf8State::new();
        for chunk in bytes.chunks(BLOCK) {
            let mut block = [b' '; BLOCK];
            block[..chunk.len()].copy_from_slice(chunk);
            let non_ascii = scalar::classify(&block).non_ascii;
            backend.check_utf8(&block, non_ascii, &mut state);
        }
        state.is_valid()
    }

    fn scalar_run(bytes: &[u8]) -> bool {
        run(Backend::Scalar, bytes)
    }

    #[test]
    fn accepts_valid_sequences() {
        assert!(scalar_run(b"plain ascii"));
        assert!(scalar_run("é δ 猫 👍".as_bytes()));
        assert!(scalar_run(
            "\u{7f}\u{80}\u{7ff}\u{800}\u{ffff}\u{10000}\u{10ffff}".as_bytes()
        ));
    }

    #[test]
    fn rejects_malformed_sequences() {
        assert!(!scalar_run(&[0x80]), "lone continuation");
        assert!(!scalar_run(&[0xC0, 0xAF]), "overlong two-byte form");
        assert!(!scalar_run(&[0xC1, 0x81]), "overlong two-byte form");
        assert!(!scalar_run(&[0xE0, 0x80, 0x80]), "overlong three-byte form");
        assert!(!scalar_run(&[0xED, 0xA0, 0x80]), "encoded surrogate");
        assert!(!scalar_run(&[0xF0, 0x80, 0x80, 0x80]), "overlong four-byte form");
        assert!(!scalar_run(&[0xF4, 0x90, 0x80, 0x80]), "above U+10FFFF");
        assert!(!scalar_run(&[0xF5, 0x80, 0x80, 0x80]), "invalid lead byte");
        assert!(!scalar_run(&[0xE2, 0x82]), "truncated at end of input");
        assert!(!scalar_run(&[0xC3, b'a']), "ascii where continuation expected");
    }

    #[test]
    fn state_carries_across_blocks() {
        // 63 ASCII bytes then the lead of a two-byte sequence; the
        // continuation arrives in the next block.
        let mut bytes = vec![b'x'; 63];
        bytes.extend_from_slice("é".as_bytes());
        assert!(run(Backend::active(), &bytes));
        assert!(scalar_run(&bytes));

        let mut bad = vec![b'x'; 63];
        bad.extend_from_slice(&[0xC3, 0xC3]);
        assert!(!run(Backend::active(), &bad));
        assert!(!scalar_run(&bad));
    }

    /// Good and bad sequences straddling every lane and block boundary.
    fn corpus() -> Vec<Vec<u8>> {
        let mut inputs: Vec<Vec<u8>> = vec![
            b"plain ascii".to_vec(),
            "é δ 猫 👍".as_bytes().to_vec(),
            "\u{7f}\u{80}\u{7ff}\u{800}\u{ffff}\u{10000}\u{10ffff}".as_bytes().to_vec(),
            vec![b'x'; 200],
        ];
        let bad: [&[u8]; 7] = [
            &[0x80],
            &[0xC0, 0xAF],
            &[0xE0, 0x80, 0x80],
            &[0xED, 0xA0, 0x80],
            &[0xF4, 0x90, 0x80, 0x80],
            &[0xF5, 0x80],
            &[0xE2, 0x82],
        ];
        for offset in [0usize, 13, 14, 15, 16, 30, 31, 32, 47, 48, 61, 62, 63, 64, 65, 100] {
            for good in ["é", "€", "😀"] {
                let mut bytes = vec![b'x'; offset];
                bytes.extend_from_slice(good.as_bytes());
                bytes.extend_from_slice(b"tail");
                inputs.push(bytes);
            }
            for seq in bad {
                let mut bytes = vec![b'x'; offset];
                bytes.extend_from_slice(seq);
                inputs.push(bytes);
            }
        }
        inputs
    }

    #[test]
    fn agrees_with_std_validation() {
        for bytes in corpus() {
            assert_eq!(
                run(Backend::active(), &bytes),
                std::str::from_utf8(&bytes).is_ok(),
                "{bytes:x?}"
            );
        }
    }

    #[test]
    fn active_backend_matches_scalar() {
        for bytes in corpus() {
            assert_eq!(
                run(Backend::active(), &bytes),
                scalar_run(&bytes),
                "{} backend disagrees with scalar on {bytes:x?}",
                Backend::active().name()
            );
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn sse42_matches_scalar() {
        if !std::arch::is_x86_feature_detected!("sse4.2") {
            return;
        }
        for bytes in corpus() {
            assert_eq!(run(Backend::Sse42, &bytes), scalar_run(&bytes), "{bytes:x?}");
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx2_matches_scalar() {
        if !std::arch::is_x86_feature_detected!("avx2") {
            return;
        }
        for bytes in corpus() {
            assert_eq!(run(Backend::Avx2, &bytes), scalar_run(&bytes), "{bytes:x?}");
        }
    }
}
