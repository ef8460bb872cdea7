//! # Domain Models
//!
//! Canonical domain types for trade enrichment.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TradeRecord`] | One validated input row |
//! | [`TradeDate`] | Calendar date in `YYYYMMDD` form |
//! | [`Price`] | Decimal price, echoed with its original precision |
//! | [`ProductId`] | Non-negative product identifier, the cache lookup key |
//! | [`ResolvedName`] | Product name from the cache, or the sentinel |
//!
//! ## Validation
//!
//! Every type enforces its invariants at construction time, so a
//! [`TradeRecord`] can only exist for a line that passed validation:
//!
//! ```rust
//! use tradeflow_core::{TradeRecord, ValidationError};
//!
//! let record = TradeRecord::parse("20230101,1,USD,100.25").unwrap();
//! assert_eq!(record.product_id().cache_key(), "1");
//!
//! let invalid = TradeRecord::parse("notadate,1,USD,100.25");
//! assert!(matches!(invalid, Err(ValidationError::InvalidDate { .. })));
//! ```

mod date;
mod name;
mod price;
mod product;
mod record;

pub use date::TradeDate;
pub use name::{ResolvedName, MISSING_PRODUCT_NAME};
pub use price::Price;
pub use product::ProductId;
pub use record::{TradeRecord, FIELD_DELIMITER};
