use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::data_source::{PriceFuture, QuoteSource, SourceError};
use crate::domain::normalize_for_primary;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{ProviderId, Symbol};

const DEFAULT_BASE_URL: &str = "https://stockprices.dev/api";
const MAX_ERROR_BODY_BYTES: usize = 512;

/// Disjoint namespaces the real-time provider splits tickers into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Stocks,
    Etfs,
}

impl InstrumentKind {
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Stocks => "stocks",
            Self::Etfs => "etfs",
        }
    }

    pub const fn alternate(self) -> Self {
        match self {
            Self::Stocks => Self::Etfs,
            Self::Etfs => Self::Stocks,
        }
    }
}

/// Real-time adapter for stockprices.dev.
///
/// Which namespace a ticker lives in cannot be told from the ticker alone, so
/// a failed stocks lookup is retried once against the ETF endpoint.
#[derive(Clone)]
pub struct StockpricesAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl Default for StockpricesAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::default()),
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }
}

impl StockpricesAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_ticker(&self, ticker: &str) -> Result<f64, SourceError> {
        let first = InstrumentKind::Stocks;
        let first_error = match self.fetch_kind(ticker, first).await {
            Ok(price) => return Ok(price),
            Err(error) => error,
        };

        let second = first.alternate();
        debug!(ticker, kind = second.path_segment(), "retrying alternate endpoint");
        match self.fetch_kind(ticker, second).await {
            Ok(price) => Ok(price),
            Err(second_error) => Err(SourceError::unavailable(format!(
                "stockprices.dev lookup failed for {ticker:?}: {} error: {}; {} error: {}",
                first.path_segment(),
                first_error.message(),
                second.path_segment(),
                second_error.message()
            ))),
        }
    }

    async fn fetch_kind(&self, ticker: &str, kind: InstrumentKind) -> Result<f64, SourceError> {
        let url = format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            kind.path_segment(),
            urlencoding::encode(ticker)
        );
        let request = HttpRequest::get(url)
            .with_header("User-Agent", crate::http_client::user_agent())
            .with_header("Accept", "application/json");

        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!(
                "failed to fetch quote for symbol {ticker:?}: {}",
                error.message()
            ))
        })?;

        if !response.is_success() {
            let body = truncate_utf8(response.body.trim(), MAX_ERROR_BODY_BYTES);
            let detail = if body.is_empty() {
                String::from("no response body")
            } else {
                body.to_owned()
            };
            return Err(SourceError::unavailable(format!(
                "unexpected status {} for {ticker:?}: {detail}",
                response.status
            )));
        }

        parse_quote_payload(ticker, &response.body)
    }
}

impl QuoteSource for StockpricesAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Stockprices
    }

    fn fetch_price<'a>(&'a self, symbol: &'a Symbol) -> PriceFuture<'a> {
        Box::pin(async move {
            let ticker = normalize_for_primary(symbol.as_str())?;
            self.fetch_ticker(&ticker).await
        })
    }
}

#[derive(Debug, Deserialize)]
struct StockpricesQuote {
    #[serde(rename = "Price")]
    price: Option<f64>,
}

fn parse_quote_payload(ticker: &str, body: &str) -> Result<f64, SourceError> {
    let payload: StockpricesQuote = serde_json::from_str(body).map_err(|error| {
        SourceError::unavailable(format!(
            "failed to decode quote response for {ticker:?}: {error}"
        ))
    })?;

    match payload.price {
        Some(price) if price.is_finite() => Ok(price),
        _ => Err(SourceError::unavailable(format!(
            "missing price for symbol {ticker:?}"
        ))),
    }
}

fn truncate_utf8(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}
