use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "Self::validate_self"))]
pub struct HarnessOptions {
    #[serde(default = "HarnessOptions::default_vec_length")]
    #[validate(range(min = 1, max = 16777216))]
    pub vec_length: usize,
    #[serde(default = "HarnessOptions::default_num_vecs")]
    #[validate(range(min = 1, max = 4096))]
    pub num_vecs: usize,
    #[serde(default = "HarnessOptions::default_rounds")]
    #[validate(range(min = 1, max = 65536))]
    pub rounds: u32,
    #[serde(default = "HarnessOptions::default_value_min")]
    pub value_min: i32,
    #[serde(default = "HarnessOptions::default_value_max")]
    pub value_max: i32,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl HarnessOptions {
    fn default_vec_length() -> usize {
        20_000
    }
    fn default_num_vecs() -> usize {
        100
    }
    fn default_rounds() -> u32 {
        16
    }
    fn default_value_min() -> i32 {
        0
    }
    fn default_value_max() -> i32 {
        9
    }
    pub fn validate_self(&self) -> Result<(), ValidationError> {
        if self.value_min > self.value_max {
            return Err(ValidationError::new(
                "`value_min` should not be greater than `value_max`",
            ));
        }
        Ok(())
    }

    pub fn from_toml(s: &str) -> crate::Result<Self> {
        let options = toml::from_str::<Self>(s)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            vec_length: Self::default_vec_length(),
            num_vecs: Self::default_num_vecs(),
            rounds: Self::default_rounds(),
            value_min: Self::default_value_min(),
            value_max: Self::default_value_max(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn defaults() {
        let options = HarnessOptions::from_toml("").unwrap();
        assert_eq!(options.vec_length, 20_000);
        assert_eq!(options.num_vecs, 100);
        assert_eq!(options.rounds, 16);
        assert_eq!((options.value_min, options.value_max), (0, 9));
        assert_eq!(options.seed, None);
        assert!(HarnessOptions::default().validate().is_ok());
    }

    #[test]
    fn partial() {
        let options = HarnessOptions::from_toml("rounds = 4\nseed = 42\nvalue_min = -5").unwrap();
        assert_eq!(options.rounds, 4);
        assert_eq!(options.seed, Some(42));
        assert_eq!(options.value_min, -5);
        assert_eq!(options.vec_length, 20_000);
    }

    #[test]
    fn unknown_field() {
        assert!(matches!(
            HarnessOptions::from_toml("threshold = 3"),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn out_of_range() {
        assert!(matches!(
            HarnessOptions::from_toml("num_vecs = 0"),
            Err(Error::InvalidOptions(_))
        ));
        assert!(matches!(
            HarnessOptions::from_toml("rounds = 0"),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn inverted_value_range() {
        assert!(matches!(
            HarnessOptions::from_toml("value_min = 10\nvalue_max = 1"),
            Err(Error::InvalidOptions(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            HarnessOptions::load("/nonexistent/gatedot.toml"),
            Err(Error::Io(_))
        ));
    }
}
