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

use core::arch::x86_64::*;

#[inline]
#[crate::target_cpu(enable = "v2")]
pub fn emulate_mm_reduce_add_epi64(x: __m128i) -> i64 {
    _mm_extract_epi64(x, 0).wrapping_add(_mm_extract_epi64(x, 1))
}

#[inline]
#[crate::target_cpu(enable = "v3")]
pub fn emulate_mm256_reduce_add_epi64(x: __m256i) -> i64 {
    let lo = _mm256_castsi256_si128(x);
    let hi = _mm256_extracti128_si256(x, 1);
    let x = _mm_add_epi64(lo, hi);
    _mm_extract_epi64(x, 0).wrapping_add(_mm_extract_epi64(x, 1))
}
