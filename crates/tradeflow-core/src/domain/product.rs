use std::fmt::{Display, Formatter};

use crate::ValidationError;

/// Product identifier as it appears in the trade feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductId(i64);

impl ProductId {
    /// Parse a non-negative 64-bit integer identifier.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.parse::<i64>() {
            Ok(value) if value >= 0 => Ok(Self(value)),
            _ => Err(ValidationError::InvalidProductId {
                value: input.to_string(),
            }),
        }
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Canonical cache key: the decimal form of the parsed value, so `007`
    /// and `7` resolve to the same entry.
    pub fn cache_key(self) -> String {
        self.0.to_string()
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
