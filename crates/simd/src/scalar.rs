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

//! Scalar kernels.
//!
//! The accumulator wraps on overflow in every kernel, the same way a 64-bit
//! vector lane does, so results stay identical across the whole `i32` domain.

use crate::threshold::{THRESHOLD, mask};
use seq_macro::seq;

/// `a * b` if `a > 2`, otherwise `0`, without a branch.
///
/// The mask is sign-extended to 64 bits and applied to the widened product.
#[inline(always)]
pub fn gate(a: i32, b: i32) -> i64 {
    i64::from(mask(a)) & (i64::from(a) * i64::from(b))
}

/// The oracle. Every other kernel must return exactly what this returns.
pub fn reference(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    let n = lhs.len();
    let mut sum = 0_i64;
    for i in 0..n {
        if lhs[i] > THRESHOLD {
            sum = sum.wrapping_add(lhs[i] as i64 * rhs[i] as i64);
        }
    }
    sum
}

/// Indexed loop over inputs re-sliced to a common length, so the bounds checks
/// can be hoisted out of the loop.
pub fn indexed(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    let n = lhs.len();
    let (lhs, rhs) = (&lhs[..n], &rhs[..n]);
    let mut sum = 0_i64;
    for i in 0..n {
        if lhs[i] > THRESHOLD {
            sum = sum.wrapping_add(lhs[i] as i64 * rhs[i] as i64);
        }
    }
    sum
}

pub fn zip(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    let mut sum = 0_i64;
    for (&a, &b) in lhs.iter().zip(rhs) {
        if a > THRESHOLD {
            sum = sum.wrapping_add(a as i64 * b as i64);
        }
    }
    sum
}

pub fn filter_map(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    lhs.iter()
        .zip(rhs)
        .filter_map(|(&a, &b)| (a > THRESHOLD).then(|| a as i64 * b as i64))
        .fold(0_i64, i64::wrapping_add)
}

pub fn fold(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    lhs.iter().zip(rhs).fold(0_i64, |acc, (&a, &b)| {
        if a > THRESHOLD {
            acc.wrapping_add(a as i64 * b as i64)
        } else {
            acc
        }
    })
}

pub fn branchless(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    let n = lhs.len();
    let mut sum = 0_i64;
    for i in 0..n {
        sum = sum.wrapping_add(gate(lhs[i], rhs[i]));
    }
    sum
}

/// Four independent lanes per iteration, summed pairwise, then a scalar tail.
pub fn unrolled(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    let (lhs_arrays, lhs_remainder) = lhs.as_chunks::<4>();
    let (rhs_arrays, rhs_remainder) = rhs.as_chunks::<4>();
    let mut sum = 0_i64;
    for (a, b) in lhs_arrays.iter().zip(rhs_arrays) {
        seq!(I in 0..4 {
            let g = [#(gate(a[I], b[I]),)*];
        });
        let pair_0 = g[0].wrapping_add(g[1]);
        let pair_1 = g[2].wrapping_add(g[3]);
        sum = sum.wrapping_add(pair_0.wrapping_add(pair_1));
    }
    for (&a, &b) in lhs_remainder.iter().zip(rhs_remainder) {
        sum = sum.wrapping_add(gate(a, b));
    }
    sum
}

/// Twin cursors stepped in lock-step until the first one reaches `start + n`.
///
/// The lengths are compared once up front; the loop itself does no bounds checks.
pub fn cursor(lhs: &[i32], rhs: &[i32]) -> i64 {
    assert_eq!(lhs.len(), rhs.len());
    let end = lhs.as_ptr_range().end;
    let mut a = lhs.as_ptr();
    let mut b = rhs.as_ptr();
    let mut sum = 0_i64;
    while a != end {
        // both cursors advance together and `lhs.len() == rhs.len()`, so `b` stays in `rhs` while `a != end`
        let (x, y) = unsafe { (a.read(), b.read()) };
        if x > THRESHOLD {
            sum = sum.wrapping_add(x as i64 * y as i64);
        }
        (a, b) = unsafe { (a.add(1), b.add(1)) };
    }
    sum
}
