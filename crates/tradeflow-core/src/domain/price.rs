use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bigdecimal::BigDecimal;

use crate::ValidationError;

/// Trade price, kept exactly as written in the feed.
///
/// The text must read as an arbitrary-precision decimal; it is echoed
/// unchanged so no digit or trailing zero is lost on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price(String);

impl Price {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let decimal_chars = input.bytes().any(|b| b.is_ascii_digit())
            && input
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-' | b'e' | b'E'));
        if !decimal_chars || BigDecimal::from_str(input).is_err() {
            return Err(ValidationError::InvalidPrice {
                value: input.to_string(),
            });
        }
        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
