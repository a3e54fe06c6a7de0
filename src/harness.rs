use crate::kernel::{self, Kernel, Pair, REFERENCE};
use crate::{Error, HarnessOptions, Result, VectorPool};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use simd::threshold;

/// Hand-checked example: `3*13 + 4*14 + ... + 10*20 = 900`.
pub const FIXED_LHS: [i32; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
pub const FIXED_RHS: [i32; 10] = [11, 12, 13, 14, 15, 16, 17, 18, 19, 20];
pub const FIXED_EXPECTED: i64 = 900;

/// Tails shorter than every stride in use are checked on each sampled pair.
const TAIL_WINDOW: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    pub pairs: usize,
    pub elements: usize,
    pub kernels: usize,
}

pub struct Harness {
    kernels: Vec<Kernel>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with_kernels(kernel::kernels())
    }

    /// The oracle is always compared against, whether or not it is in `kernels`.
    pub fn with_kernels(kernels: Vec<Kernel>) -> Self {
        Self { kernels }
    }

    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    /// Runs every kernel on one pair and returns the agreed sum.
    ///
    /// Stops at the first kernel that disagrees with the oracle.
    pub fn check(&self, lhs: &[i32], rhs: &[i32]) -> Result<i64> {
        let pair = Pair::new(lhs, rhs)?;
        self.check_pair(pair)
    }

    fn check_pair(&self, pair: Pair<'_>) -> Result<i64> {
        let expected = REFERENCE.call(pair);
        for kernel in self.kernels.iter() {
            let actual = kernel.call(pair);
            if actual != expected {
                log::error!(
                    "kernel {} diverged from the oracle: {actual} != {expected} (n = {})",
                    kernel.name,
                    pair.len()
                );
                return Err(Error::EquivalenceViolation {
                    kernel: kernel.name,
                    len: pair.len(),
                    expected,
                    actual,
                });
            }
            log::debug!("{}: {actual} (n = {})", kernel.name, pair.len());
        }
        Ok(expected)
    }

    /// Scalar and vector forms of the threshold mask must agree on every value.
    pub fn check_predicate(&self, values: &[i32]) -> Result<()> {
        let (arrays_8, _) = values.as_chunks::<8>();
        let (arrays_4, _) = values.as_chunks::<4>();
        let lanes = values.iter().map(|&x| (x, threshold::mask_lane(x)));
        let lanes_4 = arrays_4
            .iter()
            .flat_map(|&x| x.into_iter().zip(threshold::mask_x4(x)));
        let lanes_8 = arrays_8
            .iter()
            .flat_map(|&x| x.into_iter().zip(threshold::mask_x8(x)));
        for (value, vector) in lanes.chain(lanes_4).chain(lanes_8) {
            let scalar = threshold::mask(value);
            if scalar != vector {
                log::error!("threshold mask of {value} diverged: {scalar:#x} != {vector:#x}");
                return Err(Error::PredicateMismatch {
                    value,
                    scalar,
                    vector,
                });
            }
        }
        Ok(())
    }

    /// The fixed example, checked against its hand-computed sum as well.
    pub fn check_fixed(&self) -> Result<()> {
        let sum = self.check(&FIXED_LHS, &FIXED_RHS)?;
        if sum != FIXED_EXPECTED {
            log::error!("oracle returned {sum} for the fixed example, expected {FIXED_EXPECTED}");
            return Err(Error::EquivalenceViolation {
                kernel: REFERENCE.name,
                len: FIXED_LHS.len(),
                expected: FIXED_EXPECTED,
                actual: sum,
            });
        }
        self.check_predicate(&FIXED_LHS)?;
        log::info!(
            "fixed example: {} kernels agree on {sum}",
            self.kernels.len()
        );
        Ok(())
    }

    /// Samples `rounds` pairs from `pool`; each pair is checked in full and
    /// with its last `round % 16` elements cut off, to reach every tail length.
    pub fn check_pool<R: Rng + ?Sized>(
        &self,
        pool: &VectorPool,
        rounds: u32,
        rng: &mut R,
    ) -> Result<Report> {
        let mut report = Report {
            kernels: self.kernels.len(),
            ..Default::default()
        };
        for round in 0..rounds as usize {
            let (lhs, rhs) = pool.sample_pair(rng);
            let pair = Pair::new(lhs, rhs)?;
            let sum = self.check_pair(pair)?;
            log::debug!("round {round}: {sum} (n = {})", pair.len());
            let cut = round % TAIL_WINDOW;
            let prefix = pair.prefix(pair.len().saturating_sub(cut));
            self.check_pair(prefix)?;
            self.check_predicate(prefix.lhs())?;
            report.pairs += 2;
            report.elements += pair.len() + prefix.len();
        }
        Ok(report)
    }

    /// Fixed example, then a freshly generated pool.
    pub fn run(&self, options: &HarnessOptions) -> Result<Report> {
        self.check_fixed()?;
        let seed = options.seed.unwrap_or_else(rand::random);
        log::info!(
            "generating {} vectors of length {} with seed {seed}",
            options.num_vecs,
            options.vec_length
        );
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pool = VectorPool::create(
            options.vec_length,
            options.num_vecs,
            options.value_min..=options.value_max,
            &mut rng,
        )?;
        let report = self.check_pool(&pool, options.rounds, &mut rng)?;
        log::info!(
            "{} kernels agree on {} pairs ({} elements)",
            report.kernels,
            report.pairs,
            report.elements
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignores_threshold(lhs: &[i32], rhs: &[i32]) -> i64 {
        lhs.iter().zip(rhs).map(|(&a, &b)| a as i64 * b as i64).sum()
    }

    fn drops_odd_lanes(lhs: &[i32], rhs: &[i32]) -> i64 {
        let mut sum = 0;
        for i in (0..lhs.len()).step_by(2) {
            sum += simd::scalar::gate(lhs[i], rhs[i]);
        }
        sum
    }

    fn truncates_tail(lhs: &[i32], rhs: &[i32]) -> i64 {
        let n = lhs.len() / 8 * 8;
        simd::scalar::reference(&lhs[..n], &rhs[..n])
    }

    fn seeded_pool(seed: u64) -> (VectorPool, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let pool = VectorPool::create(20_000, 8, 0..=9, &mut rng).unwrap();
        (pool, rng)
    }

    #[test]
    fn fixed_example() {
        Harness::new().check_fixed().unwrap();
    }

    #[test]
    fn concrete_scenarios() {
        let harness = Harness::new();
        assert_eq!(harness.check(&[1, 2, 3, 4, 5], &[5, 6, 7, 8, 9]).unwrap(), 98);
        assert_eq!(harness.check(&FIXED_LHS, &FIXED_RHS).unwrap(), 900);
        assert_eq!(harness.check(&[], &[]).unwrap(), 0);
    }

    #[test]
    fn boundary_and_negative_products() {
        let harness = Harness::new();
        assert_eq!(harness.check(&[1, 2, 3], &[7, 7, 7]).unwrap(), 21);
        let lhs = [3, 2, 3, 3, 3, 3, 3, 1, 3];
        let rhs = [1, -100000, 1, 1, 1, 1, 1, -100000, 1];
        assert_eq!(harness.check(&lhs, &rhs).unwrap(), 21);
    }

    #[test]
    fn remainder_lengths() {
        let harness = Harness::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for n in [5, 6, 7, 9, 15, 17, 31, 33] {
            let lhs = (0..n).map(|_| rng.random_range(0..10)).collect::<Vec<i32>>();
            let rhs = (0..n).map(|_| rng.random_range(0..10)).collect::<Vec<i32>>();
            harness.check(&lhs, &rhs).unwrap();
        }
    }

    #[test]
    fn large_random_pool() {
        let (pool, mut rng) = seeded_pool(20_000);
        let report = Harness::new().check_pool(&pool, 8, &mut rng).unwrap();
        assert_eq!(report.pairs, 16);
        assert!(report.elements > 16 * 19_000);
    }

    #[test]
    fn length_mismatch_is_rejected_first() {
        let harness = Harness::with_kernels(vec![Kernel::new("panics", |_, _| {
            panic!("kernel must not run on mismatched input")
        })]);
        assert!(matches!(
            harness.check(&[1, 2, 3], &[1, 2]),
            Err(Error::LengthMismatch { lhs: 3, rhs: 2 })
        ));
    }

    #[test]
    fn broken_kernels_are_caught() {
        let (pool, _) = seeded_pool(1);
        for (name, f) in [
            ("ignores_threshold", ignores_threshold as kernel::KernelFn),
            ("drops_odd_lanes", drops_odd_lanes),
            ("truncates_tail", truncates_tail),
        ] {
            let harness = Harness::with_kernels(vec![REFERENCE, Kernel::new(name, f)]);
            let mut rng = ChaCha8Rng::seed_from_u64(2);
            match harness.check_pool(&pool, 16, &mut rng) {
                Err(Error::EquivalenceViolation { kernel, .. }) => assert_eq!(kernel, name),
                other => panic!("{name} was not caught: {other:?}"),
            }
        }
    }

    #[test]
    fn predicate_forms_agree() {
        let harness = Harness::new();
        let values = (-20..20).chain([i32::MIN, i32::MAX]).collect::<Vec<_>>();
        harness.check_predicate(&values).unwrap();
    }

    #[test]
    fn every_round_checks_two_pairs() {
        let (pool, mut rng) = seeded_pool(3);
        for rounds in [1, 2, 17] {
            let report = Harness::new().check_pool(&pool, rounds, &mut rng).unwrap();
            assert_eq!(report.pairs, 2 * rounds as usize);
        }
    }

    #[test]
    fn run_with_options() {
        let options = HarnessOptions {
            vec_length: 1000,
            num_vecs: 4,
            rounds: 4,
            seed: Some(9),
            ..Default::default()
        };
        let report = Harness::new().run(&options).unwrap();
        assert_eq!(report.pairs, 8);
        assert_eq!(report.kernels, kernel::kernels().len());
    }
}
