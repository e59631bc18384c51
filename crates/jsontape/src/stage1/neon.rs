//! NEON classifier for aarch64: four 16-byte lanes per block.
//!
//! NEON has no movemask; lane compare results are reduced to a 64-bit
//! position mask by ANDing each byte with its in-lane bit weight and then
//! folding with pairwise adds.

use core::arch::aarch64::{
    uint8x16_t, vandq_u8, vcgeq_u8, vceqq_u8, vdupq_n_u8, veorq_u8, vextq_u8, vgetq_lane_u64,
    vld1q_u8, vmaxvq_u8, vorrq_u8, vpaddq_u8, vqsubq_u8, vqtbl1q_u8, vreinterpretq_u64_u8,
    vshrq_n_u8, vtstq_u8,
};

use super::classify::{BlockClass, HI_NIBBLE, LO_NIBBLE, OP_BITS, WS_BITS};
use super::utf8::{BYTE_1_HIGH, BYTE_1_LOW, BYTE_2_HIGH, Utf8State};

const BIT_WEIGHTS: [u8; 16] = [
    0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80,
];

/// Classify one 64-byte block.
///
/// # Safety
///
/// `block` must hold at least 64 readable bytes. NEON itself is
/// architecturally guaranteed on aarch64.
#[target_feature(enable = "neon")]
pub(crate) unsafe fn classify(block: &[u8]) -> BlockClass {
    unsafe {
        let ptr = block.as_ptr();
        let lanes = [
            vld1q_u8(ptr),
            vld1q_u8(ptr.add(16)),
            vld1q_u8(ptr.add(32)),
            vld1q_u8(ptr.add(48)),
        ];

        let quote = vdupq_n_u8(b'"');
        let backslash = vdupq_n_u8(b'\\');
        let high_bit = vdupq_n_u8(0x80);
        let ws_bits = vdupq_n_u8(WS_BITS);
        let op_bits = vdupq_n_u8(OP_BITS);

        let classes = [
            nibble_class(lanes[0]),
            nibble_class(lanes[1]),
            nibble_class(lanes[2]),
            nibble_class(lanes[3]),
        ];
        let mut whitespace = [vdupq_n_u8(0); 4];
        let mut op = [vdupq_n_u8(0); 4];
        let mut quotes = [vdupq_n_u8(0); 4];
        let mut backslashes = [vdupq_n_u8(0); 4];
        let mut non_ascii = [vdupq_n_u8(0); 4];
        for i in 0..4 {
            whitespace[i] = vtstq_u8(classes[i], ws_bits);
            op[i] = vtstq_u8(classes[i], op_bits);
            quotes[i] = vceqq_u8(lanes[i], quote);
            backslashes[i] = vceqq_u8(lanes[i], backslash);
            non_ascii[i] = vcgeq_u8(lanes[i], high_bit);
        }
        BlockClass {
            whitespace: quad_mask(whitespace),
            op: quad_mask(op),
            quote: quad_mask(quotes),
            backslash: quad_mask(backslashes),
            non_ascii: quad_mask(non_ascii),
        }
    }
}

/// Validate one 64-byte block's UTF-8, carrying sequence state in `state`.
///
/// # Safety
///
/// `block` must hold at least 64 readable bytes.
#[target_feature(enable = "neon")]
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
        let mut prev = vld1q_u8(prev_bytes.as_ptr());
        let mut error = vdupq_n_u8(0);
        let ptr = block.as_ptr();
        for lane_start in [0, 16, 32, 48] {
            let lane = vld1q_u8(ptr.add(lane_start));
            error = vorrq_u8(error, lane_error(prev, lane));
            prev = lane;
        }
        state.advance_block(block, vmaxvq_u8(error) != 0);
    }
}

/// Error bits for one 16-byte lane, judged against the lane before it.
#[target_feature(enable = "neon")]
unsafe fn lane_error(prev: uint8x16_t, lane: uint8x16_t) -> uint8x16_t {
    unsafe {
        let prev1 = vextq_u8::<15>(prev, lane);
        let prev2 = vextq_u8::<14>(prev, lane);
        let prev3 = vextq_u8::<13>(prev, lane);

        let nib = vdupq_n_u8(0x0f);
        let byte_1_high = vqtbl1q_u8(vld1q_u8(BYTE_1_HIGH.as_ptr()), vshrq_n_u8::<4>(prev1));
        let byte_1_low = vqtbl1q_u8(vld1q_u8(BYTE_1_LOW.as_ptr()), vandq_u8(prev1, nib));
        let byte_2_high = vqtbl1q_u8(vld1q_u8(BYTE_2_HIGH.as_ptr()), vshrq_n_u8::<4>(lane));
        let special = vandq_u8(vandq_u8(byte_1_high, byte_1_low), byte_2_high);

        // Saturating subtraction leaves the high bit set exactly where a
        // three-byte lead sits two back or a four-byte lead sits three
        // back, i.e. where a second or third continuation is owed.
        let third = vqsubq_u8(prev2, vdupq_n_u8(0x60));
        let fourth = vqsubq_u8(prev3, vdupq_n_u8(0x70));
        let must_continue = vandq_u8(vorrq_u8(third, fourth), vdupq_n_u8(0x80));
        // An owed continuation and an actual one cancel; anything left is
        // an error.
        veorq_u8(must_continue, special)
    }
}

#[target_feature(enable = "neon")]
unsafe fn nibble_class(lane: uint8x16_t) -> uint8x16_t {
    unsafe {
        let lo_table = vld1q_u8(LO_NIBBLE.as_ptr());
        let hi_table = vld1q_u8(HI_NIBBLE.as_ptr());
        let lo_nib = vandq_u8(lane, vdupq_n_u8(0x0f));
        let hi_nib = vshrq_n_u8::<4>(lane);
        vandq_u8(vqtbl1q_u8(lo_table, lo_nib), vqtbl1q_u8(hi_table, hi_nib))
    }
}

/// Reduce four 0x00/0xFF lane masks to one 64-bit position mask.
#[target_feature(enable = "neon")]
unsafe fn quad_mask(lanes: [uint8x16_t; 4]) -> u64 {
    unsafe {
        let weights = vld1q_u8(BIT_WEIGHTS.as_ptr());
        let m0 = vandq_u8(lanes[0], weights);
        let m1 = vandq_u8(lanes[1], weights);
        let m2 = vandq_u8(lanes[2], weights);
        let m3 = vandq_u8(lanes[3], weights);
        let sum0 = vpaddq_u8(m0, m1);
        let sum1 = vpaddq_u8(m2, m3);
        let folded = vpaddq_u8(sum0, sum1);
        let folded = vpaddq_u8(folded, folded);
        // after three pairwise folds the 64 weight bytes sit in the low
        // eight lanes, one byte per original 8 input bytes
        vgetq_lane_u64::<0>(vreinterpretq_u64_u8(folded))
    }
}
