use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Separator between a ticker and its market-suffix segment (`INFY.NS`).
pub const MARKET_DELIMITER: char = '.';

/// Market suffix the delayed provider expects for undecorated tickers.
pub const DOMESTIC_MARKET_SUFFIX: &str = "us";

/// Normalized market symbol/ticker.
///
/// Stored trimmed and uppercased, so equality ignores case and surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some(first) = normalized.chars().next() {
            if !first.is_ascii_alphanumeric() {
                return Err(ValidationError::SymbolInvalidStart { ch: first });
            }
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == MARKET_DELIMITER || ch == '-';
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        if normalized.ends_with(MARKET_DELIMITER) {
            return Err(ValidationError::SymbolInvalidChar {
                ch: MARKET_DELIMITER,
                index: len - 1,
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exchange code after the first delimiter, if any.
    pub fn market_suffix(&self) -> Option<&str> {
        self.0
            .split_once(MARKET_DELIMITER)
            .map(|(_, suffix)| suffix)
    }

    /// True for undecorated tickers, the only ones the real-time provider serves.
    pub fn is_domestic(&self) -> bool {
        self.market_suffix().is_none()
    }
}

/// Canonicalize a raw ticker for the real-time provider: trimmed, uppercased,
/// truncated at the first market delimiter.
pub fn normalize_for_primary(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }

    let ticker = match trimmed.split_once(MARKET_DELIMITER) {
        Some((ticker, _)) => ticker,
        None => trimmed,
    };
    if ticker.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }

    Ok(ticker.to_ascii_uppercase())
}

/// Canonicalize a raw ticker for the delayed provider: trimmed, lowercased,
/// with the domestic suffix appended when no market segment is present.
pub fn normalize_for_delayed(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if lowered.contains(MARKET_DELIMITER) {
        Ok(lowered)
    } else {
        Ok(format!("{lowered}{MARKET_DELIMITER}{DOMESTIC_MARKET_SUFFIX}"))
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
