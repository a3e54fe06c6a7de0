use crate::{Error, Result};
use rand::Rng;
use rand::distr::{Distribution, Uniform};
use std::ops::RangeInclusive;

/// A fixed set of equal-length random sequences that pairs are sampled from.
pub struct VectorPool {
    vectors: Vec<Vec<i32>>,
}

impl VectorPool {
    pub fn create<R: Rng + ?Sized>(
        vec_length: usize,
        num_vecs: usize,
        values: RangeInclusive<i32>,
        rng: &mut R,
    ) -> Result<Self> {
        if num_vecs == 0 {
            return Err(Error::EmptyPool);
        }
        let (min, max) = values.into_inner();
        let uniform =
            Uniform::new_inclusive(min, max).map_err(|_| Error::EmptyRange { min, max })?;
        let vectors: Vec<Vec<i32>> = (0..num_vecs)
            .map(|_| (0..vec_length).map(|_| uniform.sample(rng)).collect::<Vec<_>>())
            .collect();
        Ok(Self { vectors })
    }

    /// Two sequences chosen uniformly, with replacement.
    pub fn sample_pair<R: Rng + ?Sized>(&self, rng: &mut R) -> (&[i32], &[i32]) {
        let i = rng.random_range(0..self.vectors.len());
        let j = rng.random_range(0..self.vectors.len());
        (&self.vectors[i], &self.vectors[j])
    }

    pub fn num_vecs(&self) -> usize {
        self.vectors.len()
    }

    pub fn vec_length(&self) -> usize {
        self.vectors[0].len()
    }
}
