//! Byte classification backends.
//!
//! Every backend exposes two operations over one 64-byte block: classify
//! its bytes, and validate its UTF-8 continuation structure. Classification
//! answers which bytes are JSON whitespace, which are structural operators
//! (`{ } [ ] : ,`), which are quotes, backslashes, or non-ASCII. The answers
//! come back as five position bitmasks so the scanner can run its
//! string/escape algebra without ever branching on individual bytes.
//!
//! Whitespace and operators share a single branchless lookup: each byte's low
//! and high nibble index a 16-entry table and the two results are ANDed.
//! Operator bytes land in the low three bits ([`OP_BITS`]), whitespace in the
//! next two ([`WS_BITS`]).

#[cfg(target_arch = "x86_64")]
use super::avx2;
#[cfg(target_arch = "aarch64")]
use super::neon;
use super::scalar;
#[cfg(target_arch = "x86_64")]
use super::sse42;
use super::utf8::Utf8State;

/// Bytes classified per call. All backends operate on this granularity
/// regardless of their native vector width.
pub(crate) const BLOCK: usize = 64;

/// Classification bit carried by operator bytes.
pub(crate) const OP_BITS: u8 = 0x07;
/// Classification bit carried by whitespace bytes.
pub(crate) const WS_BITS: u8 = 0x18;

/// Low-nibble half of the classification table.
pub(crate) const LO_NIBBLE: [u8; 16] = [16, 0, 0, 0, 0, 0, 0, 0, 0, 8, 12, 1, 2, 9, 0, 0];
/// High-nibble half of the classification table.
pub(crate) const HI_NIBBLE: [u8; 16] = [8, 0, 18, 4, 0, 1, 0, 1, 0, 0, 0, 3, 2, 1, 0, 0];

/// Per-block classification masks; bit `i` describes byte `i`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockClass {
    pub whitespace: u64,
    pub op: u64,
    pub quote: u64,
    pub backslash: u64,
    pub non_ascii: u64,
}

/// A vector implementation chosen once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backend {
    #[cfg(target_arch = "x86_64")]
    Avx2,
    #[cfg(target_arch = "x86_64")]
    Sse42,
    #[cfg(target_arch = "aarch64")]
    Neon,
    Scalar,
}

impl Backend {
    /// Probe the CPU and pick the widest supported implementation.
    fn detect() -> Backend {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx2") {
                return Backend::Avx2;
            }
            if std::arch::is_x86_feature_detected!("sse4.2") {
                return Backend::Sse42;
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            // NEON is architecturally guaranteed on aarch64.
            return Backend::Neon;
        }
        #[allow(unreachable_code)]
        Backend::Scalar
    }

    /// The backend selected for this process.
    pub(crate) fn active() -> Backend {
        static ACTIVE: std::sync::OnceLock<Backend> = std::sync::OnceLock::new();
        *ACTIVE.get_or_init(Backend::detect)
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => "avx2",
            #[cfg(target_arch = "x86_64")]
            Backend::Sse42 => "sse4.2",
            #[cfg(target_arch = "aarch64")]
            Backend::Neon => "neon",
            Backend::Scalar => "scalar",
        }
    }

    /// Classify the first [`BLOCK`] bytes of `block`.
    ///
    /// # Panics
    ///
    /// Panics if `block` is shorter than [`BLOCK`] bytes.
    pub(crate) fn classify(self, block: &[u8]) -> BlockClass {
        assert!(block.len() >= BLOCK);
        match self {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: `active()` only returns Avx2/Sse42 after a successful
            // feature probe, and the length was just asserted.
            Backend::Avx2 => unsafe { avx2::classify(block) },
            #[cfg(target_arch = "x86_64")]
            Backend::Sse42 => unsafe { sse42::classify(block) },
            #[cfg(target_arch = "aarch64")]
            // SAFETY: NEON is always available on aarch64.
            Backend::Neon => unsafe { neon::classify(block) },
            Backend::Scalar => scalar::classify(block),
        }
    }

    /// Validate the block's UTF-8 continuation structure, in lockstep with
    /// [`Backend::classify`]: the caller hands over the block together with
    /// the `non_ascii` mask it just computed, and sequence state is
    /// threaded through `state`.
    ///
    /// # Panics
    ///
    /// Panics if `block` is shorter than [`BLOCK`] bytes.
    pub(crate) fn check_utf8(self, block: &[u8], non_ascii: u64, state: &mut Utf8State) {
        assert!(block.len() >= BLOCK);
        match self {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: both probes imply the 128-bit instructions the kernel
            // uses, and the length was just asserted.
            Backend::Avx2 | Backend::Sse42 => unsafe {
                sse42::check_utf8(block, non_ascii, state);
            },
            #[cfg(target_arch = "aarch64")]
            // SAFETY: NEON is always available on aarch64.
            Backend::Neon => unsafe { neon::check_utf8(block, non_ascii, state) },
            Backend::Scalar => state.check_block_scalar(block, non_ascii),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BLOCK, Backend, HI_NIBBLE, LO_NIBBLE, OP_BITS, WS_BITS, scalar};

    fn nibble_class(b: u8) -> u8 {
        LO_NIBBLE[(b & 0x0f) as usize] & HI_NIBBLE[(b >> 4) as usize]
    }

    #[test]
    fn tables_classify_json_bytes() {
        for b in [b' ', b'\t', b'\n', b'\r'] {
            assert_ne!(nibble_class(b) & WS_BITS, 0, "{b:#04x} should be whitespace");
            assert_eq!(nibble_class(b) & OP_BITS, 0);
        }
        for b in [b'{', b'}', b'[', b']', b':', b','] {
            assert_ne!(nibble_class(b) & OP_BITS, 0, "{b:#04x} should be an operator");
            assert_eq!(nibble_class(b) & WS_BITS, 0);
        }
        for b in [b'"', b'\\', b'a', b'0', b'-', 0u8, 0x80u8] {
            assert_eq!(nibble_class(b), 0, "{b:#04x} should be neither");
        }
    }

    fn sample_blocks() -> Vec<[u8; BLOCK]> {
        let mut blocks = Vec::new();
        let mut all = [0u8; BLOCK];
        for (i, slot) in all.iter_mut().enumerate() {
            *slot = u8::try_from(i).unwrap();
        }
        blocks.push(all);
        let mut high = all;
        for slot in &mut high {
            *slot |= 0x80;
        }
        blocks.push(high);
        let mut json = [b' '; BLOCK];
        let sample = br#"{"key": [1, -2.5e3, true, "a\"b\\"]}"#;
        json[..sample.len()].copy_from_slice(sample);
        blocks.push(json);
        blocks.push([b'\\'; BLOCK]);
        blocks.push([b'"'; BLOCK]);
        blocks
    }

    #[test]
    fn active_backend_matches_scalar() {
        let backend = Backend::active();
        for block in sample_blocks() {
            assert_eq!(
                backend.classify(&block),
                scalar::classify(&block),
                "{} backend disagrees with scalar",
                backend.name()
            );
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn sse42_matches_scalar() {
        if !std::arch::is_x86_feature_detected!("sse4.2") {
            return;
        }
        for block in sample_blocks() {
            assert_eq!(Backend::Sse42.classify(&block), scalar::classify(&block));
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn avx2_matches_scalar() {
        if !std::arch::is_x86_feature_detected!("avx2") {
            return;
        }
        for block in sample_blocks() {
            assert_eq!(Backend::Avx2.classify(&block), scalar::classify(&block));
        }
    }
}
