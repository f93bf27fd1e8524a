use rust_decimal::Decimal;
use serde::Deserialize;

/// Body for both increase and decrease endpoints.
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}
