//! Portable fallback classifier.
//!
//! Same contract as the vector backends, one byte at a time. It doubles as
//! the correctness baseline the SIMD paths are tested against.

use super::classify::{BLOCK, BlockClass, HI_NIBBLE, LO_NIBBLE, OP_BITS, WS_BITS};

pub(crate) fn classify(block: &[u8]) -> BlockClass {
    let mut class = BlockClass::default();
    for (i, &b) in block[..BLOCK].iter().enumerate() {
        let kind = LO_NIBBLE[(b & 0x0f) as usize] & HI_NIBBLE[(b >> 4) as usize];
        class.whitespace |= u64::from(kind & WS_BITS != 0) << i;
        class.op |= u64::from(kind & OP_BITS != 0) << i;
        class.quote |= u64::from(b == b'"') << i;
        class.backslash |= u64::from(b == b'\\') << i;
        class.non_ascii |= u64::from(b >= 0x80) << i;
    }
    class
}
