// This software is licensed under a dual license model:
//
// GNU Affero General Public License v3 (AGPLv3): You may use, modify, and
// distribute this software under the terms of the AGPLv3.
//
// Elastic License v2 (ELv2): You may also use, modify, and distribute this
// software under the Elastic License v2, which has specific restrictions.
//
// We welcome any commercial collaboration or support. For inquiries
// regarding the licenses, please contact us at:
// vectorchord-inquiry@tensorchord.ai
//
// Copyright (c) 2025 TensorChord Inc.

//! The predicate `x > 2`, as a lane mask.
//!
//! A mask is `-1` (all bits set) when the predicate holds and `0` otherwise, so
//! `mask & product` either keeps the product or zeroes it.

pub const THRESHOLD: i32 = 2;

/// Scalar form: the comparison as `0`/`1`, negated in two's complement.
#[inline(always)]
pub fn mask(x: i32) -> i32 {
    i32::from(x > THRESHOLD).wrapping_neg()
}

/// Vector form for one value, placed in lane 0 of a 4-lane vector.
#[inline(always)]
pub fn mask_lane(x: i32) -> i32 {
    mask_x4::mask_x4([x, 0, 0, 0])[0]
}

#[cfg_attr(feature = "internal", simd_macros::public)]
mod mask_x4 {
    #[cfg_attr(feature = "internal", simd_macros::public)]
    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v2")]
    fn mask_x4_v2(this: [i32; 4]) -> [i32; 4] {
        use core::arch::x86_64::*;
        let x = unsafe { _mm_loadu_si128(this.as_ptr().cast()) };
        let m = _mm_cmpgt_epi32(x, _mm_set1_epi32(super::THRESHOLD));
        let mut result = [0_i32; 4];
        unsafe { _mm_storeu_si128(result.as_mut_ptr().cast(), m) };
        result
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn mask_x4_v2_test() {
        use rand::Rng;
        if !crate::is_cpu_detected!("v2") {
            println!("test {} ... skipped (v2)", module_path!());
            return;
        }
        let mut rng = rand::rng();
        for _ in 0..if cfg!(not(miri)) { 4096 } else { 1 } {
            let this: [i32; 4] = [
                rng.random_range(-4..8),
                rng.random_range(-4..8),
                rng.random(),
                rng.random(),
            ];
            let specialized = unsafe { mask_x4_v2(this) };
            let fallback = fallback(this);
            assert_eq!(specialized, fallback, "input = {this:?}");
        }
    }

    #[cfg_attr(feature = "internal", simd_macros::public)]
    #[inline]
    #[cfg(target_arch = "aarch64")]
    #[crate::target_cpu(enable = "a2")]
    fn mask_x4_a2(this: [i32; 4]) -> [i32; 4] {
        use core::arch::aarch64::*;
        let x = unsafe { vld1q_s32(this.as_ptr()) };
        let m = vreinterpretq_s32_u32(vcgtq_s32(x, vdupq_n_s32(super::THRESHOLD)));
        let mut result = [0_i32; 4];
        unsafe { vst1q_s32(result.as_mut_ptr(), m) };
        result
    }

    #[cfg(all(target_arch = "aarch64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn mask_x4_a2_test() {
        use rand::Rng;
        if !crate::is_cpu_detected!("a2") {
            println!("test {} ... skipped (a2)", module_path!());
            return;
        }
        let mut rng = rand::rng();
        for _ in 0..if cfg!(not(miri)) { 4096 } else { 1 } {
            let this: [i32; 4] = [
                rng.random_range(-4..8),
                rng.random_range(-4..8),
                rng.random(),
                rng.random(),
            ];
            let specialized = unsafe { mask_x4_a2(this) };
            let fallback = fallback(this);
            assert_eq!(specialized, fallback, "input = {this:?}");
        }
    }

    #[crate::multiversion(@"v2", @"a2")]
    pub fn mask_x4(this: [i32; 4]) -> [i32; 4] {
        this.map(super::mask)
    }
}

#[inline(always)]
pub fn mask_x4(this: [i32; 4]) -> [i32; 4] {
    mask_x4::mask_x4(this)
}

#[cfg_attr(feature = "internal", simd_macros::public)]
mod mask_x8 {
    #[cfg_attr(feature = "internal", simd_macros::public)]
    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v3")]
    fn mask_x8_v3(this: [i32; 8]) -> [i32; 8] {
        use core::arch::x86_64::*;
        let x = unsafe { _mm256_loadu_si256(this.as_ptr().cast()) };
        let m = _mm256_cmpgt_epi32(x, _mm256_set1_epi32(super::THRESHOLD));
        let mut result = [0_i32; 8];
        unsafe { _mm256_storeu_si256(result.as_mut_ptr().cast(), m) };
        result
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn mask_x8_v3_test() {
        use rand::Rng;
        if !crate::is_cpu_detected!("v3") {
            println!("test {} ... skipped (v3)", module_path!());
            return;
        }
        let mut rng = rand::rng();
        for _ in 0..if cfg!(not(miri)) { 4096 } else { 1 } {
            let mut this = [0_i32; 8];
            for (i, x) in this.iter_mut().enumerate() {
                *x = if i % 2 == 0 {
                    rng.random_range(-4..8)
                } else {
                    rng.random()
                };
            }
            let specialized = unsafe { mask_x8_v3(this) };
            let fallback = fallback(this);
            assert_eq!(specialized, fallback, "input = {this:?}");
        }
    }

    #[crate::multiversion(@"v3", "v2", "a2")]
    pub fn mask_x8(this: [i32; 8]) -> [i32; 8] {
        this.map(super::mask)
    }
}

#[inline(always)]
pub fn mask_x8(this: [i32; 8]) -> [i32; 8] {
    mask_x8::mask_x8(this)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDGES: [i32; 9] = [i32::MIN, -100000, -1, 0, 1, 2, 3, 4, i32::MAX];

    #[test]
    fn mask_is_all_or_nothing() {
        for x in EDGES {
            let m = mask(x);
            assert!(m == 0 || m == -1, "mask({x}) = {m:#x}");
            assert_eq!(m == -1, x > 2, "mask({x}) = {m:#x}");
        }
    }

    #[test]
    fn mask_boundary_is_exclusive() {
        assert_eq!(mask(1), 0);
        assert_eq!(mask(2), 0);
        assert_eq!(mask(3), -1);
        assert_eq!(mask_lane(1), 0);
        assert_eq!(mask_lane(2), 0);
        assert_eq!(mask_lane(3), -1);
    }

    #[test]
    fn mask_forms_agree() {
        for x in EDGES {
            assert_eq!(mask_lane(x), mask(x), "x = {x}");
        }
        for window in EDGES.windows(4) {
            let this = [window[0], window[1], window[2], window[3]];
            assert_eq!(mask_x4(this), this.map(mask));
        }
        for window in EDGES.windows(8) {
            let mut this = [0_i32; 8];
            this.copy_from_slice(window);
            assert_eq!(mask_x8(this), this.map(mask));
        }
    }

    #[test]
    fn mask_gates_negative_products() {
        let product = 3_i32.wrapping_mul(-100000);
        assert_eq!(mask(2) & product, 0);
        assert_eq!(mask(3) & product, product);
    }
}
