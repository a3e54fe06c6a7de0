use crate::{Error, Result};

/// Two sequences of the same length.
#[derive(Debug, Clone, Copy)]
pub struct Pair<'a> {
    lhs: &'a [i32],
    rhs: &'a [i32],
}

impl<'a> Pair<'a> {
    pub fn new(lhs: &'a [i32], rhs: &'a [i32]) -> Result<Self> {
        if lhs.len() != rhs.len() {
            return Err(Error::LengthMismatch {
                lhs: lhs.len(),
                rhs: rhs.len(),
            });
        }
        Ok(Self { lhs, rhs })
    }

    pub fn lhs(&self) -> &'a [i32] {
        self.lhs
    }

    pub fn rhs(&self) -> &'a [i32] {
        self.rhs
    }

    pub fn len(&self) -> usize {
        self.lhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lhs.is_empty()
    }

    /// The first `n` elements of both sequences.
    pub fn prefix(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            lhs: &self.lhs[..n],
            rhs: &self.rhs[..n],
        }
    }
}

pub type KernelFn = fn(&[i32], &[i32]) -> i64;

#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    pub name: &'static str,
    pub f: KernelFn,
}

impl Kernel {
    pub const fn new(name: &'static str, f: KernelFn) -> Self {
        Self { name, f }
    }

    #[inline]
    pub fn call(&self, pair: Pair<'_>) -> i64 {
        (self.f)(pair.lhs, pair.rhs)
    }
}

pub const REFERENCE: Kernel = Kernel::new("scalar::reference", simd::scalar::reference);

/// Every kernel that can run on this machine, the oracle first.
///
/// Specialized wide-lane kernels are listed only if the cpu supports them.
#[allow(unsafe_code)]
pub fn kernels() -> Vec<Kernel> {
    let mut result = vec![
        REFERENCE,
        Kernel::new("scalar::indexed", simd::scalar::indexed),
        Kernel::new("scalar::zip", simd::scalar::zip),
        Kernel::new("scalar::filter_map", simd::scalar::filter_map),
        Kernel::new("scalar::fold", simd::scalar::fold),
        Kernel::new("scalar::branchless", simd::scalar::branchless),
        Kernel::new("scalar::unrolled", simd::scalar::unrolled),
        Kernel::new("scalar::cursor", simd::scalar::cursor),
        Kernel::new(
            "gated::reduce_sum_of_gated_xy",
            simd::gated::reduce_sum_of_gated_xy,
        ),
    ];
    #[cfg(target_arch = "x86_64")]
    {
        use simd::gated::reduce_sum_of_gated_xy as g;
        if simd::is_cpu_detected!("v4") {
            result.push(Kernel::new("gated::reduce_sum_of_gated_xy::v4", |lhs, rhs| {
                unsafe { g::reduce_sum_of_gated_xy_v4(lhs, rhs) }
            }));
        }
        if simd::is_cpu_detected!("v3") {
            result.push(Kernel::new("gated::reduce_sum_of_gated_xy::v3", |lhs, rhs| {
                unsafe { g::reduce_sum_of_gated_xy_v3(lhs, rhs) }
            }));
        }
        if simd::is_cpu_detected!("v2") {
            result.push(Kernel::new("gated::reduce_sum_of_gated_xy::v2", |lhs, rhs| {
                unsafe { g::reduce_sum_of_gated_xy_v2(lhs, rhs) }
            }));
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        use simd::gated::reduce_sum_of_gated_xy as g;
        if simd::is_cpu_detected!("a2") {
            result.push(Kernel::new("gated::reduce_sum_of_gated_xy::a2", |lhs, rhs| {
                unsafe { g::reduce_sum_of_gated_xy_a2(lhs, rhs) }
            }));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_rejects_length_mismatch() {
        let err = Pair::new(&[1, 2, 3], &[1, 2]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { lhs: 3, rhs: 2 }));
    }

    #[test]
    fn pair_prefix_is_clamped() {
        let pair = Pair::new(&[1, 2, 3], &[4, 5, 6]).unwrap();
        assert_eq!(pair.prefix(2).lhs(), &[1, 2]);
        assert_eq!(pair.prefix(2).rhs(), &[4, 5]);
        assert_eq!(pair.prefix(7).len(), 3);
        assert!(pair.prefix(0).is_empty());
    }

    #[test]
    fn registry_starts_with_the_oracle() {
        let kernels = kernels();
        assert_eq!(kernels[0].name, REFERENCE.name);
        for name in [
            "scalar::branchless",
            "scalar::unrolled",
            "scalar::cursor",
            "gated::reduce_sum_of_gated_xy",
        ] {
            assert!(kernels.iter().any(|k| k.name == name), "missing {name}");
        }
        let mut names = kernels.iter().map(|k| k.name).collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), kernels.len());
    }

    #[test]
    fn every_kernel_maps_empty_to_zero() {
        let pair = Pair::new(&[], &[]).unwrap();
        for kernel in kernels() {
            assert_eq!(kernel.call(pair), 0, "kernel = {}", kernel.name);
        }
    }
}
