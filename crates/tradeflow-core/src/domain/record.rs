use crate::domain::{Price, ProductId, TradeDate};
use crate::ValidationError;

/// Field separator of both the trade feed and the enriched output.
pub const FIELD_DELIMITER: char = ',';

const TRADE_FIELDS: usize = 4;

/// One validated trade row: `date,productId,currency,price`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    date: TradeDate,
    product_id: ProductId,
    currency: String,
    price: Price,
}

impl TradeRecord {
    /// Parse and validate one data line.
    ///
    /// The line must split into exactly four fields, the date must be a real
    /// calendar date, the id a non-negative integer and the price an exact
    /// decimal. The currency is taken as-is.
    pub fn parse(line: &str) -> Result<Self, ValidationError> {
        let fields: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        let [date, product_id, currency, price] = fields.as_slice() else {
            return Err(ValidationError::FieldCount {
                expected: TRADE_FIELDS,
                found: fields.len(),
            });
        };

        let date = TradeDate::parse(date)?;
        let product_id = ProductId::parse(product_id)?;
        let price = Price::parse(price)?;

        Ok(Self {
            date,
            product_id,
            currency: (*currency).to_string(),
            price,
        })
    }

    pub const fn date(&self) -> TradeDate {
        self.date
    }

    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn price(&self) -> &Price {
        &self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_line() {
        let record = TradeRecord::parse("20230102,2,EUR,200.50").expect("valid line");
        assert_eq!(record.date().to_string(), "20230102");
        assert_eq!(record.product_id().value(), 2);
        assert_eq!(record.currency(), "EUR");
        assert_eq!(record.price().to_string(), "200.50");
    }

    #[test]
    fn keeps_price_precision() {
        let record =
            TradeRecord::parse("20230102,2,EUR,0.123456789012345678").expect("valid line");
        assert_eq!(record.price().to_string(), "0.123456789012345678");
    }

    #[test]
    fn keeps_prices_wider_than_fixed_point_decimals() {
        for price in [
            "123456789012345678901234567890.25",
            "0.12345678901234567890123456789",
            "79228162514264337593543950336",
        ] {
            let line = format!("20230101,1,USD,{price}");
            let record = TradeRecord::parse(&line).expect("long price is valid");
            assert_eq!(record.price().as_str(), price);
        }
    }

    #[test]
    fn currency_is_not_validated() {
        let record = TradeRecord::parse("20230102,2,,1").expect("empty currency is accepted");
        assert_eq!(record.currency(), "");
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = TradeRecord::parse("20230101,1,USD").expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::FieldCount {
                expected: 4,
                found: 3
            }
        );

        let err = TradeRecord::parse("20230101,1,USD,1.0,extra").expect_err("must fail");
        assert!(matches!(err, ValidationError::FieldCount { found: 5, .. }));
    }

    #[test]
    fn rejects_bad_date_before_id() {
        let err = TradeRecord::parse("notadate,x,USD,100.25").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidDate { .. }));
    }

    #[test]
    fn rejects_non_numeric_id() {
        let err = TradeRecord::parse("20230101,abc,USD,100.25").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidProductId { .. }));
    }

    #[test]
    fn rejects_unparseable_price() {
        for line in ["20230101,1,USD,", "20230101,1,USD,1.2.3", "20230101,1,USD,abc"] {
            let err = TradeRecord::parse(line).expect_err("must fail");
            assert!(matches!(err, ValidationError::InvalidPrice { .. }), "{line}");
        }
    }
}
