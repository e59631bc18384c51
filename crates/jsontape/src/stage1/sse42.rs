//! 128-bit kernels for x86_64: four 16-byte lanes per block. The AVX2
//! backend shares the UTF-8 kernel; every CPU with AVX2 implements the
//! shuffle and saturating arithmetic it needs.

use core::arch::x86_64::{
    __m128i, _mm_alignr_epi8, _mm_and_si128, _mm_cmpeq_epi8, _mm_loadu_si128, _mm_movemask_epi8,
    _mm_or_si128, _mm_set1_epi8, _mm_setzero_si128, _mm_shuffle_epi8, _mm_srli_epi16,
    _mm_subs_epu8, _mm_testz_si128, _mm_xor_si128,
};

use super::classify::{BlockClass, HI_NIBBLE, LO_NIBBLE, OP_BITS, WS_BITS};
use super::utf8::{BYTE_1_HIGH, BYTE_1_LOW, BYTE_2_HIGH, Utf8State};

/// Classify one 64-byte block.
///
/// # Safety
///
/// SSE4.2 must be available and `block` must hold at least 64 readable bytes.
#[target_feature(enable = "sse4.2")]
pub(crate) unsafe fn classify(block: &[u8]) -> BlockClass {
    unsafe {
        let ptr = block.as_ptr();
        let lanes = [
            _mm_loadu_si128(ptr.cast::<__m128i>()),
            _mm_loadu_si128(ptr.add(16).cast::<__m128i>()),
            _mm_loadu_si128(ptr.add(32).cast::<__m128i>()),
            _mm_loadu_si128(ptr.add(48).cast::<__m128i>()),
        ];

        BlockClass {
            whitespace: kind_mask(&lanes, WS_BITS),
            op: kind_mask(&lanes, OP_BITS),
            quote: eq_mask(&lanes, b'"'),
            backslash: eq_mask(&lanes, b'\\'),
            non_ascii: quad_mask(lanes),
        }
    }
}

#[target_feature(enable = "sse4.2")]
unsafe fn eq_mask(lanes: &[__m128i; 4], byte: u8) -> u64 {
    unsafe {
        let needle = _mm_set1_epi8(byte as i8);
        quad_mask([
            _mm_cmpeq_epi8(lanes[0], needle),
            _mm_cmpeq_epi8(lanes[1], needle),
            _mm_cmpeq_epi8(lanes[2], needle),
            _mm_cmpeq_epi8(lanes[3], needle),
        ])
    }
}

#[target_feature(enable = "sse4.2")]
unsafe fn kind_mask(lanes: &[__m128i; 4], bits: u8) -> u64 {
    unsafe {
        let wanted = _mm_set1_epi8(bits as i8);
        let zero = _mm_setzero_si128();
        let mut hits = [zero; 4];
        for i in 0..4 {
            hits[i] = _mm_cmpeq_epi8(_mm_and_si128(nibble_class(lanes[i]), wanted), zero);
        }
        !quad_mask(hits)
    }
}

#[target_feature(enable = "sse4.2")]
unsafe fn nibble_class(lane: __m128i) -> __m128i {
    unsafe {
        let lo_table = _mm_loadu_si128(LO_NIBBLE.as_ptr().cast());
        let hi_table = _mm_loadu_si128(HI_NIBBLE.as_ptr().cast());
        let nib = _mm_set1_epi8(0x0f);
        let lo_nib = _mm_and_si128(lane, nib);
        let hi_nib = _mm_and_si128(_mm_srli_epi16::<4>(lane), nib);
        _mm_and_si128(
            _mm_shuffle_epi8(lo_table, lo_nib),
            _mm_shuffle_epi8(hi_table, hi_nib),
        )
    }
}

/// Validate one 64-byte block's UTF-8, carrying sequence state in `state`.
///
/// # Safety
///
/// SSE4.2 must be available and `block` must hold at least 64 readable
/// bytes.
#[target_feature(enable = "sse4.2")]
pub(crate) unsafe fn check_utf8(block: &[u8], non_ascii: u64, state: &mut Utf8State) {
    unsafe {
        if state.failed() {
            return;
        }
        if non_ascii == 0 {
            state.skip_ascii_block(block);
            return;
        }
        let prev_bytes = state.prev_lane();
        let mut prev = _mm_loadu_si128(prev_bytes.as_ptr().cast::<__m128i>());
        let mut error = _mm_setzero_si128();
        let ptr = block.as_ptr();
        for lane_start in [0, 16, 32, 48] {
            let lane = _mm_loadu_si128(ptr.add(lane_start).cast::<__m128i>());
            error = _mm_or_si128(error, lane_error(prev, lane));
            prev = lane;
        }
        state.advance_block(block, _mm_testz_si128(error, error) == 0);
    }
}

/// Error bits for one 16-byte lane, judged against the lane before it.
#[target_feature(enable = "sse4.2")]
unsafe fn lane_error(prev: __m128i, lane: __m128i) -> __m128i {
    unsafe {
        let prev1 = _mm_alignr_epi8::<15>(lane, prev);
        let prev2 = _mm_alignr_epi8::<14>(lane, prev);
        let prev3 = _mm_alignr_epi8::<13>(lane, prev);

        let nib = _mm_set1_epi8(0x0f);
        let byte_1_high = _mm_shuffle_epi8(
            _mm_loadu_si128(BYTE_1_HIGH.as_ptr().cast()),
            _mm_and_si128(_mm_srli_epi16::<4>(prev1), nib),
        );
        let byte_1_low = _mm_shuffle_epi8(
            _mm_loadu_si128(BYTE_1_LOW.as_ptr().cast()),
            _mm_and_si128(prev1, nib),
        );
        let byte_2_high = _mm_shuffle_epi8(
            _mm_loadu_si128(BYTE_2_HIGH.as_ptr().cast()),
            _mm_and_si128(_mm_srli_epi16::<4>(lane), nib),
        );
        let special = _mm_and_si128(_mm_and_si128(byte_1_high, byte_1_low), byte_2_high);

        // Saturating subtraction leaves the high bit set exactly where a
        // three-byte lead sits two back or a four-byte lead sits three
        // back, i.e. where a second or third continuation is owed.
        let third = _mm_subs_epu8(prev2, _mm_set1_epi8(0x60));
        let fourth = _mm_subs_epu8(prev3, _mm_set1_epi8(0x70));
        let must_continue = _mm_and_si128(
            _mm_or_si128(third, fourth),
            _mm_set1_epi8(0x80u8 as i8),
        );
        // An owed continuation and an actual one cancel; anything left is
        // an error.
        _mm_xor_si128(must_continue, special)
    }
}

/// Combine four 16-bit lane movemasks into one block mask.
#[target_feature(enable = "sse4.2")]
unsafe fn quad_mask(lanes: [__m128i; 4]) -> u64 {
    unsafe {
        let mut mask = 0u64;
        for (i, lane) in lanes.into_iter().enumerate() {
            mask |= u64::from(_mm_movemask_epi8(lane) as u16) << (16 * i);
        }
        mask
    }
}
