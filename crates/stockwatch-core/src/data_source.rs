//! Quote source trait and the error type shared by every provider.
//!
//! Each upstream is wrapped in a [`QuoteSource`] adapter that turns its wire
//! format into a plain price. Every way an upstream can fail (transport,
//! status, payload, missing field) surfaces as [`SourceErrorKind::Unavailable`];
//! only the message differs.
//!
//! # Example
//!
//! ```rust,ignore
//! use stockwatch_core::{QuoteSource, StockpricesAdapter, Symbol};
//!
//! async fn price(adapter: &StockpricesAdapter) -> Result<f64, SourceError> {
//!     adapter.fetch_price(&Symbol::parse("AAPL")?).await
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{ProviderId, Symbol, ValidationError};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Upstream could not produce a price (transport, status, payload, missing field).
    Unavailable,
    /// Synthetic: the provider is short-circuited until its cooldown expires.
    CircuitOpen,
    /// No enabled provider serves this symbol.
    Unsupported,
    /// Rejected before any network call.
    InvalidRequest,
}

/// Structured source error used by failover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn circuit_open(provider: ProviderId) -> Self {
        Self {
            kind: SourceErrorKind::CircuitOpen,
            message: format!("{provider} temporarily disabled due to recent failures"),
            retryable: true,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unsupported,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::CircuitOpen => "source.circuit_open",
            SourceErrorKind::Unsupported => "source.unsupported",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(value: ValidationError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

pub type PriceFuture<'a> = Pin<Box<dyn Future<Output = Result<f64, SourceError>> + Send + 'a>>;

/// One upstream quote provider.
pub trait QuoteSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetch the latest price for `symbol`, normalized to whatever form this
    /// provider expects.
    fn fetch_price<'a>(&'a self, symbol: &'a Symbol) -> PriceFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_identifiers() {
        assert_eq!(SourceError::unavailable("x").code(), "source.unavailable");
        assert_eq!(
            SourceError::circuit_open(ProviderId::Stockprices).code(),
            "source.circuit_open"
        );
        assert_eq!(SourceError::unsupported("x").code(), "source.unsupported");
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let error = SourceError::from(ValidationError::EmptySymbol);
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
        assert!(!error.retryable());
        assert_eq!(error.message(), "symbol cannot be empty");
    }
}
