use serde::{Deserialize, Serialize};

use crate::{ProviderId, Symbol, UtcDateTime, ValidationError};

/// Last traded price for a symbol, produced fresh each poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub price: f64,
    pub source: ProviderId,
    pub fetched_at: UtcDateTime,
}

impl Quote {
    pub fn new(
        symbol: Symbol,
        price: f64,
        source: ProviderId,
        fetched_at: UtcDateTime,
    ) -> Result<Self, ValidationError> {
        if !price.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "price" });
        }

        Ok(Self {
            symbol,
            price,
            source,
            fetched_at,
        })
    }
}
