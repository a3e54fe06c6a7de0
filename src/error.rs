#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("length mismatch: lhs has {lhs} elements but rhs has {rhs}")]
    LengthMismatch { lhs: usize, rhs: usize },
    #[error("kernel `{kernel}` returned {actual} but the oracle returned {expected} (n = {len})")]
    EquivalenceViolation {
        kernel: &'static str,
        len: usize,
        expected: i64,
        actual: i64,
    },
    #[error("threshold mask of {value} is {scalar:#x} in scalar form but {vector:#x} in vector form")]
    PredicateMismatch { value: i32, scalar: i32, vector: i32 },
    #[error("vector pool is empty")]
    EmptyPool,
    #[error("value range {min}..={max} is empty")]
    EmptyRange { min: i32, max: i32 },
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] validator::ValidationErrors),
    #[error("failed to parse options: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
