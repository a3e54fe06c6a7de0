//! Cross-validation of the gated dot product kernels in the `simd` crate.
//!
//! [`Harness`] runs every registered [`Kernel`] over a fixed example and over
//! pairs sampled from a [`VectorPool`], and stops at the first kernel that
//! disagrees with the oracle.

pub mod error;
pub mod harness;
pub mod kernel;
pub mod options;
pub mod pool;

pub use error::{Error, Result};
pub use harness::{Harness, Report};
pub use kernel::{Kernel, Pair};
pub use options::HarnessOptions;
pub use pool::VectorPool;
