//! AVX2 classifier for x86_64: two 32-byte lanes per block.

use core::arch::x86_64::{
    __m256i, _mm256_and_si256, _mm256_broadcastsi128_si256, _mm256_cmpeq_epi8, _mm256_loadu_si256,
    _mm256_movemask_epi8, _mm256_set1_epi8, _mm256_setzero_si256, _mm256_shuffle_epi8,
    _mm256_srli_epi16, _mm_loadu_si128,
};

use super::classify::{BlockClass, HI_NIBBLE, LO_NIBBLE, OP_BITS, WS_BITS};

/// Classify one 64-byte block.
///
/// # Safety
///
/// AVX2 must be available and `block` must hold at least 64 readable bytes.
#[target_feature(enable = "avx2")]
pub(crate) unsafe fn classify(block: &[u8]) -> BlockClass {
    unsafe {
        let ptr = block.as_ptr();
        let lo = _mm256_loadu_si256(ptr.cast::<__m256i>());
        let hi = _mm256_loadu_si256(ptr.add(32).cast::<__m256i>());

        let quote = _mm256_set1_epi8(b'"' as i8);
        let backslash = _mm256_set1_epi8(b'\\' as i8);
        BlockClass {
            whitespace: kind_mask(lo, hi, WS_BITS),
            op: kind_mask(lo, hi, OP_BITS),
            quote: pair_mask(_mm256_cmpeq_epi8(lo, quote), _mm256_cmpeq_epi8(hi, quote)),
            backslash: pair_mask(
                _mm256_cmpeq_epi8(lo, backslash),
                _mm256_cmpeq_epi8(hi, backslash),
            ),
            // movemask reads the sign bit, which is exactly the non-ASCII bit
            non_ascii: pair_mask(lo, hi),
        }
    }
}

/// Bitmask of bytes whose nibble classification carries any of `bits`.
#[target_feature(enable = "avx2")]
unsafe fn kind_mask(lo: __m256i, hi: __m256i, bits: u8) -> u64 {
    unsafe {
        let wanted = _mm256_set1_epi8(bits as i8);
        let zero = _mm256_setzero_si256();
        let lo_hit = _mm256_cmpeq_epi8(_mm256_and_si256(nibble_class(lo), wanted), zero);
        let hi_hit = _mm256_cmpeq_epi8(_mm256_and_si256(nibble_class(hi), wanted), zero);
        !pair_mask(lo_hit, hi_hit)
    }
}

/// The two-table nibble lookup, 32 bytes at a time.
#[target_feature(enable = "avx2")]
unsafe fn nibble_class(chunk: __m256i) -> __m256i {
    unsafe {
        let lo_table = _mm256_broadcastsi128_si256(_mm_loadu_si128(LO_NIBBLE.as_ptr().cast()));
        let hi_table = _mm256_broadcastsi128_si256(_mm_loadu_si128(HI_NIBBLE.as_ptr().cast()));
        let nib = _mm256_set1_epi8(0x0f);
        let lo_nib = _mm256_and_si256(chunk, nib);
        let hi_nib = _mm256_and_si256(_mm256_srli_epi16::<4>(chunk), nib);
        _mm256_and_si256(
            _mm256_shuffle_epi8(lo_table, lo_nib),
            _mm256_shuffle_epi8(hi_table, hi_nib),
        )
    }
}

/// Combine the movemasks of the two 32-byte lanes into one block mask.
#[target_feature(enable = "avx2")]
unsafe fn pair_mask(lo: __m256i, hi: __m256i) -> u64 {
    unsafe {
        let lo_bits = _mm256_movemask_epi8(lo) as u32;
        let hi_bits = _mm256_movemask_epi8(hi) as u32;
        u64::from(lo_bits) | (u64::from(hi_bits) << 32)
    }
}
