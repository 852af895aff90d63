use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::adapters::{StockpricesAdapter, StooqAdapter};
use crate::circuit_breaker::{CircuitBreaker, FailureOutcome};
use crate::data_source::{QuoteSource, SourceError};
use crate::http_client::HttpClient;
use crate::{Quote, Symbol, UtcDateTime};

/// Orders the real-time and delayed providers and guards the real-time one
/// with a circuit breaker.
///
/// Routing for one symbol:
///
/// 1. Suffixed (non-domestic) tickers skip the real-time provider.
/// 2. An open circuit skips the real-time provider until its cooldown expires.
/// 3. Otherwise the real-time provider is tried; the outcome feeds the breaker.
/// 4. With delayed fallback allowed, the delayed provider is tried next and
///    its price wins even after a real-time failure.
pub struct FailoverController {
    primary: Arc<dyn QuoteSource>,
    delayed: Arc<dyn QuoteSource>,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl Default for FailoverController {
    fn default() -> Self {
        Self::new(
            Arc::new(StockpricesAdapter::default()),
            Arc::new(StooqAdapter::default()),
        )
    }
}

impl FailoverController {
    pub fn new(primary: Arc<dyn QuoteSource>, delayed: Arc<dyn QuoteSource>) -> Self {
        Self {
            primary,
            delayed,
            circuit_breaker: Arc::new(CircuitBreaker::default()),
        }
    }

    /// Both stock adapters over one shared transport.
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self::new(
            Arc::new(StockpricesAdapter::with_http_client(http_client.clone())),
            Arc::new(StooqAdapter::with_http_client(http_client)),
        )
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Validate a raw ticker and resolve its price.
    pub async fn resolve_price(
        &self,
        raw_symbol: &str,
        allow_delayed_fallback: bool,
    ) -> Result<Quote, SourceError> {
        let symbol = Symbol::parse(raw_symbol)?;
        self.resolve(&symbol, allow_delayed_fallback).await
    }

    pub async fn resolve(
        &self,
        symbol: &Symbol,
        allow_delayed_fallback: bool,
    ) -> Result<Quote, SourceError> {
        let primary_error = if !symbol.is_domestic() {
            None
        } else if !self.circuit_breaker.allow_request() {
            debug!(%symbol, provider = %self.primary.id(), "circuit open; skipping real-time provider");
            Some(SourceError::circuit_open(self.primary.id()))
        } else {
            match self.primary.fetch_price(symbol).await {
                Ok(price) => {
                    self.circuit_breaker.record_success();
                    return quote(symbol, price, self.primary.as_ref());
                }
                Err(error) => {
                    self.record_primary_failure(&error);
                    Some(error)
                }
            }
        };

        if !allow_delayed_fallback {
            return Err(primary_error.unwrap_or_else(|| {
                warn!(
                    %symbol,
                    "looks like a non-domestic ticker; enable delayed fallback to quote it"
                );
                SourceError::unsupported(format!(
                    "real-time quotes only support plain domestic tickers (no suffix); \
                     enable delayed fallback to quote {symbol:?}"
                ))
            }));
        }

        match self.delayed.fetch_price(symbol).await {
            Ok(price) => {
                if let Some(error) = &primary_error {
                    debug!(%symbol, error = error.message(), "served by delayed provider");
                }
                quote(symbol, price, self.delayed.as_ref())
            }
            Err(delayed_error) => Err(match primary_error {
                Some(primary_error) => SourceError::unavailable(format!(
                    "real-time provider failed: {}; delayed provider failed: {}",
                    primary_error.message(),
                    delayed_error.message()
                )),
                None => SourceError::unavailable(format!(
                    "delayed provider failed: {}",
                    delayed_error.message()
                )),
            }),
        }
    }

    /// Resolve every symbol concurrently. Results are keyed by the symbol as
    /// configured, so two symbols that normalize alike are still fetched
    /// independently.
    pub async fn resolve_all(
        self: &Arc<Self>,
        symbols: impl IntoIterator<Item = Symbol>,
        allow_delayed_fallback: bool,
    ) -> BTreeMap<Symbol, Result<Quote, SourceError>> {
        let mut tasks = JoinSet::new();
        for symbol in symbols {
            let controller = Arc::clone(self);
            tasks.spawn(async move {
                let result = controller.resolve(&symbol, allow_delayed_fallback).await;
                (symbol, result)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((symbol, result)) => {
                    results.insert(symbol, result);
                }
                Err(error) => warn!(%error, "quote task did not complete"),
            }
        }
        results
    }

    fn record_primary_failure(&self, error: &SourceError) {
        match self.circuit_breaker.record_failure() {
            FailureOutcome::Opened(failures) => warn!(
                provider = %self.primary.id(),
                failures,
                cooldown_secs = self.circuit_breaker.config().cooldown.as_secs(),
                last_error = error.message(),
                "real-time provider disabled after repeated failures"
            ),
            FailureOutcome::Counted(failures) => debug!(
                provider = %self.primary.id(),
                failures,
                error = error.message(),
                "real-time provider failure"
            ),
            FailureOutcome::AlreadyOpen => {}
        }
    }
}

fn quote(symbol: &Symbol, price: f64, source: &dyn QuoteSource) -> Result<Quote, SourceError> {
    Quote::new(symbol.clone(), price, source.id(), UtcDateTime::now()).map_err(|error| {
        SourceError::unavailable(format!("{} returned an invalid price: {error}", source.id()))
    })
}
