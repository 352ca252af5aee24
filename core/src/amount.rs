use std::fmt;
use std::str::FromStr;

use crate::errors::MintError;

/// A strictly positive number of whole token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self, MintError> {
        if value == 0 {
            return Err(MintError::InvalidAmount(
                "amount must be greater than zero".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Parses a whole number of tokens. Surrounding whitespace and `_`
    /// separators are accepted; signs, fractions and exponents are not.
    pub fn parse(value: &str) -> Result<Self, MintError> {
        let digits = value.trim().replace('_', "");
        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(MintError::InvalidAmount(format!(
                "not a whole number: {:?}",
                value
            )));
        }
        let units = digits
            .parse()
            .map_err(|_| MintError::InvalidAmount(format!("amount overflow: {:?}", value)))?;
        Self::new(units)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for Amount {
    type Err = MintError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
