//! Vector front-end for full uuencoded lines.
//!
//! Only the hot case is vectorized: a 60-character line that decodes to 45
//! bytes. The subtract-32 / mask-to-6-bits step runs on 16-byte vectors (four
//! overlapping loads at offsets 0, 16, 32, 44 cover all 60 characters) and the
//! 6-to-8 bit repacking reuses the scalar group unpacker.
//!
//! Implementations:
//! - x86_64: SSE2 (runtime detected)
//! - aarch64: NEON (baseline)
//! - everything else: scalar

use super::scalar;
use super::{FULL_LINE_BYTES, FULL_LINE_CHARS};

pub(super) type FullLineFn = fn(&[u8; FULL_LINE_CHARS], &mut [u8; FULL_LINE_BYTES]);

/// Offsets of the 16-byte loads covering one 60-byte line.
#[allow(dead_code)]
const LOAD_OFFSETS: [usize; 4] = [0, 16, 32, FULL_LINE_CHARS - 16];

/// Pick the best full-line kernel for the running CPU.
#[cfg(target_arch = "x86_64")]
pub(super) fn full_line_decoder() -> FullLineFn {
    if std::arch::is_x86_feature_detected!("sse2") {
        x86::decode_full_line
    } else {
        scalar::decode_full_line
    }
}

#[cfg(target_arch = "aarch64")]
pub(super) fn full_line_decoder() -> FullLineFn {
    neon::decode_full_line
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub(super) fn full_line_decoder() -> FullLineFn {
    scalar::decode_full_line
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use core::arch::x86_64::*;

    use super::{scalar, FULL_LINE_BYTES, FULL_LINE_CHARS, LOAD_OFFSETS};

    pub(super) fn decode_full_line(line: &[u8; FULL_LINE_CHARS], out: &mut [u8; FULL_LINE_BYTES]) {
        // SAFETY: this kernel is only handed out after
        // `is_x86_feature_detected!("sse2")` succeeded.
        unsafe { decode_full_line_sse2(line, out) }
    }

    #[target_feature(enable = "sse2")]
    unsafe fn decode_full_line_sse2(
        line: &[u8; FULL_LINE_CHARS],
        out: &mut [u8; FULL_LINE_BYTES],
    ) {
        let mut sextets = [0u8; FULL_LINE_CHARS];
        let src = line.as_ptr();
        let dst = sextets.as_mut_ptr();

        // SAFETY: sse2 is enabled for this function, and offset + 16 <= 60
        // for every entry, on both arrays.
        unsafe {
            let bias = _mm_set1_epi8(32);
            let mask = _mm_set1_epi8(0x3f);
            for offset in LOAD_OFFSETS {
                let v = _mm_loadu_si128(src.add(offset) as *const __m128i);
                let v = _mm_and_si128(_mm_sub_epi8(v, bias), mask);
                _mm_storeu_si128(dst.add(offset) as *mut __m128i, v);
            }
        }

        scalar::unpack_groups(&sextets, out);
    }
}

#[cfg(target_arch = "aarch64")]
mod neon {
    use core::arch::aarch64::*;

    use super::{scalar, FULL_LINE_BYTES, FULL_LINE_CHARS, LOAD_OFFSETS};

    pub(super) fn decode_full_line(line: &[u8; FULL_LINE_CHARS], out: &mut [u8; FULL_LINE_BYTES]) {
        // SAFETY: NEON is baseline on aarch64.
        unsafe { decode_full_line_neon(line, out) }
    }

    #[target_feature(enable = "neon")]
    unsafe fn decode_full_line_neon(
        line: &[u8; FULL_LINE_CHARS],
        out: &mut [u8; FULL_LINE_BYTES],
    ) {
        let mut sextets = [0u8; FULL_LINE_CHARS];
        let src = line.as_ptr();
        let dst = sextets.as_mut_ptr();

        // SAFETY: offset + 16 <= 60 for every entry, on both arrays.
        unsafe {
            let bias = vdupq_n_u8(32);
            let mask = vdupq_n_u8(0x3f);
            for offset in LOAD_OFFSETS {
                let v = vld1q_u8(src.add(offset));
                vst1q_u8(dst.add(offset), vandq_u8(vsubq_u8(v, bias), mask));
            }
        }

        scalar::unpack_groups(&sextets, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_kernel_matches_scalar() {
        let kernel = full_line_decoder();
        for seed in 0..64u8 {
            let mut line = [0u8; FULL_LINE_CHARS];
            for (i, ch) in line.iter_mut().enumerate() {
                *ch = b' ' + ((i as u8).wrapping_mul(13).wrapping_add(seed) % 65);
            }

            let mut fast = [0u8; FULL_LINE_BYTES];
            let mut slow = [0u8; FULL_LINE_BYTES];
            kernel(&line, &mut fast);
            scalar::decode_full_line(&line, &mut slow);
            assert_eq!(fast, slow, "seed {seed}");
        }
    }
}
