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

//! Wide-lane kernels.
//!
//! x86 only has a widening `i32 * i32 -> i64` multiply for the even lanes of a
//! register (`vpmuldq`). Each iteration multiplies the even lanes, swaps every
//! adjacent pair of lanes with the permutation `[1, 0, 3, 2]` (immediate
//! `0b10_11_00_01`, applied per 128-bit half) and multiplies the even lanes
//! again, which are now the former odd lanes. The two products go to separate
//! 64-bit accumulators. NEON has a full widening multiply and needs no shuffle.

#[cfg_attr(feature = "internal", simd_macros::public)]
mod reduce_sum_of_gated_xy {
    #[cfg(test)]
    fn random_pair(n: usize, full_range: bool) -> (Vec<i32>, Vec<i32>) {
        use rand::Rng;
        let mut rng = rand::rng();
        let mut sample = || {
            if full_range {
                rng.random::<i32>()
            } else {
                rng.random_range(-3..10)
            }
        };
        let lhs = (0..n).map(|_| sample()).collect::<Vec<_>>();
        let rhs = (0..n).map(|_| sample()).collect::<Vec<_>>();
        (lhs, rhs)
    }

    #[cfg_attr(feature = "internal", simd_macros::public)]
    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v4")]
    fn reduce_sum_of_gated_xy_v4(lhs: &[i32], rhs: &[i32]) -> i64 {
        use crate::threshold::THRESHOLD;
        use core::arch::x86_64::*;
        assert_eq!(lhs.len(), rhs.len());
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = rhs.as_ptr();
        let threshold = _mm512_set1_epi32(THRESHOLD);
        let mut _0 = _mm512_setzero_si512();
        let mut _1 = _mm512_setzero_si512();
        while n >= 16 {
            let x = unsafe { _mm512_loadu_epi32(a) };
            let y = unsafe { _mm512_loadu_epi32(b) };
            let x = _mm512_maskz_mov_epi32(_mm512_cmpgt_epi32_mask(x, threshold), x);
            _0 = _mm512_add_epi64(_0, _mm512_mul_epi32(x, y));
            let x = _mm512_shuffle_epi32(x, _MM_PERM_CDAB);
            let y = _mm512_shuffle_epi32(y, _MM_PERM_CDAB);
            _1 = _mm512_add_epi64(_1, _mm512_mul_epi32(x, y));
            (n, a, b) = unsafe { (n - 16, a.add(16), b.add(16)) };
        }
        if n > 0 {
            let mask = _bzhi_u32(0xffff, n as u32) as u16;
            let x = unsafe { _mm512_maskz_loadu_epi32(mask, a) };
            let y = unsafe { _mm512_maskz_loadu_epi32(mask, b) };
            let x = _mm512_maskz_mov_epi32(_mm512_cmpgt_epi32_mask(x, threshold), x);
            _0 = _mm512_add_epi64(_0, _mm512_mul_epi32(x, y));
            let x = _mm512_shuffle_epi32(x, _MM_PERM_CDAB);
            let y = _mm512_shuffle_epi32(y, _MM_PERM_CDAB);
            _1 = _mm512_add_epi64(_1, _mm512_mul_epi32(x, y));
        }
        _mm512_reduce_add_epi64(_mm512_add_epi64(_0, _1))
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn reduce_sum_of_gated_xy_v4_test() {
        if !crate::is_cpu_detected!("v4") {
            println!("test {} ... skipped (v4)", module_path!());
            return;
        }
        for full_range in [false, true] {
            for _ in 0..if cfg!(not(miri)) { 64 } else { 1 } {
                let (lhs, rhs) = random_pair(4016, full_range);
                for z in 3984..4016 {
                    let lhs = &lhs[..z];
                    let rhs = &rhs[..z];
                    let specialized = unsafe { reduce_sum_of_gated_xy_v4(lhs, rhs) };
                    let fallback = fallback(lhs, rhs);
                    assert!(
                        specialized == fallback,
                        "specialized = {specialized}, fallback = {fallback}."
                    );
                }
            }
        }
    }

    #[cfg_attr(feature = "internal", simd_macros::public)]
    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v3")]
    fn reduce_sum_of_gated_xy_v3(lhs: &[i32], rhs: &[i32]) -> i64 {
        use crate::emulate::emulate_mm256_reduce_add_epi64;
        use crate::threshold::THRESHOLD;
        use core::arch::x86_64::*;
        assert_eq!(lhs.len(), rhs.len());
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = rhs.as_ptr();
        let threshold = _mm256_set1_epi32(THRESHOLD);
        let mut _0 = _mm256_setzero_si256();
        let mut _1 = _mm256_setzero_si256();
        while n >= 8 {
            let x = unsafe { _mm256_loadu_si256(a.cast()) };
            let y = unsafe { _mm256_loadu_si256(b.cast()) };
            let x = _mm256_and_si256(x, _mm256_cmpgt_epi32(x, threshold));
            // lanes 0, 2, 4, 6
            _0 = _mm256_add_epi64(_0, _mm256_mul_epi32(x, y));
            // lanes 1, 3, 5, 7
            let x = _mm256_shuffle_epi32(x, 0b10_11_00_01);
            let y = _mm256_shuffle_epi32(y, 0b10_11_00_01);
            _1 = _mm256_add_epi64(_1, _mm256_mul_epi32(x, y));
            (n, a, b) = unsafe { (n - 8, a.add(8), b.add(8)) };
        }
        while n > 0 {
            let (s, t) = unsafe { (a.read(), b.read()) };
            let x = _mm256_setr_epi32(s, 0, 0, 0, 0, 0, 0, 0);
            let y = _mm256_setr_epi32(t, 0, 0, 0, 0, 0, 0, 0);
            let x = _mm256_and_si256(x, _mm256_cmpgt_epi32(x, threshold));
            _0 = _mm256_add_epi64(_0, _mm256_mul_epi32(x, y));
            (n, a, b) = unsafe { (n - 1, a.add(1), b.add(1)) };
        }
        emulate_mm256_reduce_add_epi64(_mm256_add_epi64(_0, _1))
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn reduce_sum_of_gated_xy_v3_test() {
        if !crate::is_cpu_detected!("v3") {
            println!("test {} ... skipped (v3)", module_path!());
            return;
        }
        for full_range in [false, true] {
            for _ in 0..if cfg!(not(miri)) { 64 } else { 1 } {
                let (lhs, rhs) = random_pair(4016, full_range);
                for z in 3984..4016 {
                    let lhs = &lhs[..z];
                    let rhs = &rhs[..z];
                    let specialized = unsafe { reduce_sum_of_gated_xy_v3(lhs, rhs) };
                    let fallback = fallback(lhs, rhs);
                    assert!(
                        specialized == fallback,
                        "specialized = {specialized}, fallback = {fallback}."
                    );
                }
            }
        }
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn reduce_sum_of_gated_xy_v3_odd_lanes_test() {
        if !crate::is_cpu_detected!("v3") {
            println!("test {} ... skipped (v3)", module_path!());
            return;
        }
        // a wrong permutation drops or doubles exactly one lane of each pair
        for lane in 0..8 {
            let mut lhs = [0_i32; 8];
            let mut rhs = [0_i32; 8];
            lhs[lane] = 3 + lane as i32;
            rhs[lane] = 1000 + lane as i32;
            let specialized = unsafe { reduce_sum_of_gated_xy_v3(&lhs, &rhs) };
            assert_eq!(specialized, lhs[lane] as i64 * rhs[lane] as i64, "lane = {lane}");
        }
    }

    #[cfg_attr(feature = "internal", simd_macros::public)]
    #[inline]
    #[cfg(target_arch = "x86_64")]
    #[crate::target_cpu(enable = "v2")]
    fn reduce_sum_of_gated_xy_v2(lhs: &[i32], rhs: &[i32]) -> i64 {
        use crate::emulate::emulate_mm_reduce_add_epi64;
        use crate::threshold::THRESHOLD;
        use core::arch::x86_64::*;
        assert_eq!(lhs.len(), rhs.len());
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = rhs.as_ptr();
        let threshold = _mm_set1_epi32(THRESHOLD);
        let mut _0 = _mm_setzero_si128();
        let mut _1 = _mm_setzero_si128();
        while n >= 4 {
            let x = unsafe { _mm_loadu_si128(a.cast()) };
            let y = unsafe { _mm_loadu_si128(b.cast()) };
            let x = _mm_and_si128(x, _mm_cmpgt_epi32(x, threshold));
            _0 = _mm_add_epi64(_0, _mm_mul_epi32(x, y));
            let x = _mm_shuffle_epi32(x, 0b10_11_00_01);
            let y = _mm_shuffle_epi32(y, 0b10_11_00_01);
            _1 = _mm_add_epi64(_1, _mm_mul_epi32(x, y));
            (n, a, b) = unsafe { (n - 4, a.add(4), b.add(4)) };
        }
        while n > 0 {
            let (s, t) = unsafe { (a.read(), b.read()) };
            let x = _mm_cvtsi32_si128(s);
            let y = _mm_cvtsi32_si128(t);
            let x = _mm_and_si128(x, _mm_cmpgt_epi32(x, threshold));
            _0 = _mm_add_epi64(_0, _mm_mul_epi32(x, y));
            (n, a, b) = unsafe { (n - 1, a.add(1), b.add(1)) };
        }
        emulate_mm_reduce_add_epi64(_mm_add_epi64(_0, _1))
    }

    #[cfg(all(target_arch = "x86_64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn reduce_sum_of_gated_xy_v2_test() {
        if !crate::is_cpu_detected!("v2") {
            println!("test {} ... skipped (v2)", module_path!());
            return;
        }
        for full_range in [false, true] {
            for _ in 0..if cfg!(not(miri)) { 64 } else { 1 } {
                let (lhs, rhs) = random_pair(4016, full_range);
                for z in 3984..4016 {
                    let lhs = &lhs[..z];
                    let rhs = &rhs[..z];
                    let specialized = unsafe { reduce_sum_of_gated_xy_v2(lhs, rhs) };
                    let fallback = fallback(lhs, rhs);
                    assert!(
                        specialized == fallback,
                        "specialized = {specialized}, fallback = {fallback}."
                    );
                }
            }
        }
    }

    #[cfg_attr(feature = "internal", simd_macros::public)]
    #[inline]
    #[cfg(target_arch = "aarch64")]
    #[crate::target_cpu(enable = "a2")]
    fn reduce_sum_of_gated_xy_a2(lhs: &[i32], rhs: &[i32]) -> i64 {
        use crate::threshold::THRESHOLD;
        use core::arch::aarch64::*;
        assert_eq!(lhs.len(), rhs.len());
        let mut n = lhs.len();
        let mut a = lhs.as_ptr();
        let mut b = rhs.as_ptr();
        let threshold = vdupq_n_s32(THRESHOLD);
        let mut _0 = vdupq_n_s64(0);
        let mut _1 = vdupq_n_s64(0);
        while n >= 4 {
            let x = unsafe { vld1q_s32(a) };
            let y = unsafe { vld1q_s32(b) };
            let x = vandq_s32(x, vreinterpretq_s32_u32(vcgtq_s32(x, threshold)));
            _0 = vmlal_s32(_0, vget_low_s32(x), vget_low_s32(y));
            _1 = vmlal_high_s32(_1, x, y);
            (n, a, b) = unsafe { (n - 4, a.add(4), b.add(4)) };
        }
        let mut sum = vaddvq_s64(vaddq_s64(_0, _1));
        while n > 0 {
            let (s, t) = unsafe { (a.read(), b.read()) };
            sum = sum.wrapping_add(crate::scalar::gate(s, t));
            (n, a, b) = unsafe { (n - 1, a.add(1), b.add(1)) };
        }
        sum
    }

    #[cfg(all(target_arch = "aarch64", test))]
    #[test]
    #[cfg_attr(miri, ignore)]
    fn reduce_sum_of_gated_xy_a2_test() {
        if !crate::is_cpu_detected!("a2") {
            println!("test {} ... skipped (a2)", module_path!());
            return;
        }
        for full_range in [false, true] {
            for _ in 0..if cfg!(not(miri)) { 64 } else { 1 } {
                let (lhs, rhs) = random_pair(4016, full_range);
                for z in 3984..4016 {
                    let lhs = &lhs[..z];
                    let rhs = &rhs[..z];
                    let specialized = unsafe { reduce_sum_of_gated_xy_a2(lhs, rhs) };
                    let fallback = fallback(lhs, rhs);
                    assert!(
                        specialized == fallback,
                        "specialized = {specialized}, fallback = {fallback}."
                    );
                }
            }
        }
    }

    #[crate::multiversion(@"v4", @"v3", @"v2", @"a2")]
    pub fn reduce_sum_of_gated_xy(lhs: &[i32], rhs: &[i32]) -> i64 {
        assert_eq!(lhs.len(), rhs.len());
        let n = lhs.len();
        let mut sum = 0_i64;
        for i in 0..n {
            sum = sum.wrapping_add(crate::scalar::gate(lhs[i], rhs[i]));
        }
        sum
    }

    #[test]
    fn reduce_sum_of_gated_xy_fallback_test() {
        for n in 0..64 {
            let (lhs, rhs) = random_pair(n, false);
            assert_eq!(fallback(&lhs, &rhs), crate::scalar::reference(&lhs, &rhs));
        }
    }
}

/// Dispatches to the widest kernel the running cpu supports.
#[inline(always)]
pub fn reduce_sum_of_gated_xy(lhs: &[i32], rhs: &[i32]) -> i64 {
    reduce_sum_of_gated_xy::reduce_sum_of_gated_xy(lhs, rhs)
}

#[cfg(test)]
mod tests {
    use super::reduce_sum_of_gated_xy;
    use crate::scalar::reference;

    #[test]
    fn scenarios() {
        assert_eq!(reduce_sum_of_gated_xy(&[1, 2, 3, 4, 5], &[5, 6, 7, 8, 9]), 98);
        let a = (1..=10).collect::<Vec<i32>>();
        let b = (11..=20).collect::<Vec<i32>>();
        assert_eq!(reduce_sum_of_gated_xy(&a, &b), 900);
        assert_eq!(reduce_sum_of_gated_xy(&[], &[]), 0);
    }

    #[test]
    fn every_length_up_to_two_strides() {
        use rand::Rng;
        let mut rng = rand::rng();
        for n in 0..=40 {
            let a = (0..n).map(|_| rng.random_range(0..10)).collect::<Vec<i32>>();
            let b = (0..n).map(|_| rng.random_range(0..10)).collect::<Vec<i32>>();
            assert_eq!(reduce_sum_of_gated_xy(&a, &b), reference(&a, &b), "n = {n}");
        }
    }

    #[test]
    fn excluded_negative_products_vanish() {
        // full 8-lane chunk plus a tail, excluded lanes carry negative products
        let a = [3, 2, 3, 1, 3, -5, 3, 0, 2, 3];
        let b = [1, -100000, 1, -100000, 1, 100000, 1, -100000, -100000, -2];
        assert_eq!(reduce_sum_of_gated_xy(&a, &b), 3 * 4 - 6);
        assert_eq!(reference(&a, &b), 3 * 4 - 6);
    }

    #[test]
    #[should_panic]
    fn rejects_length_mismatch() {
        reduce_sum_of_gated_xy(&[3; 9], &[1; 8]);
    }
}
