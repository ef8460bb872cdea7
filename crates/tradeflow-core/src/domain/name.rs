use std::fmt::{Display, Formatter};

/// Placeholder emitted when a product id has no name in the cache.
pub const MISSING_PRODUCT_NAME: &str = "Missing Product Name";

/// Name resolved for one record of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedName {
    Found(String),
    Missing,
}

impl ResolvedName {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Found(name) => name.as_str(),
            Self::Missing => MISSING_PRODUCT_NAME,
        }
    }

    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<Option<String>> for ResolvedName {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Missing, Self::Found)
    }
}

impl Display for ResolvedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
