use std::sync::Arc;

use crate::data_source::{PriceFuture, QuoteSource, SourceError};
use crate::domain::normalize_for_delayed;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::{ProviderId, Symbol};

const DEFAULT_BASE_URL: &str = "https://stooq.com/q/l/";
/// Close column when the CSV comes back without a header row.
const HEADERLESS_CLOSE_INDEX: usize = 6;

/// Delayed adapter for Stooq's daily CSV quote endpoint.
#[derive(Clone)]
pub struct StooqAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
}

impl Default for StooqAdapter {
    fn default() -> Self {
        Self {
            http_client: Arc::new(ReqwestHttpClient::default()),
            base_url: String::from(DEFAULT_BASE_URL),
        }
    }
}

impl StooqAdapter {
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

    async fn fetch_csv(&self, stooq_symbol: &str, display: &str) -> Result<f64, SourceError> {
        let url = format!(
            "{}?s={}&i=d",
            self.base_url,
            urlencoding::encode(stooq_symbol)
        );
        let request = HttpRequest::get(url)
            .with_header("User-Agent", crate::http_client::user_agent())
            .with_header("Accept", "text/csv");

        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!(
                "failed to fetch quote for symbol {display:?}: {}",
                error.message()
            ))
        })?;

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "unexpected status {} fetching quote for {display:?}",
                response.status
            )));
        }

        parse_close_price(display, &response.body)
    }
}

impl QuoteSource for StooqAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Stooq
    }

    fn fetch_price<'a>(&'a self, symbol: &'a Symbol) -> PriceFuture<'a> {
        Box::pin(async move {
            let stooq_symbol = normalize_for_delayed(symbol.as_str())?;
            self.fetch_csv(&stooq_symbol, symbol.as_str()).await
        })
    }
}

/// Extract the close price from Stooq's `Symbol,Date,Time,Open,High,Low,Close,Volume` CSV.
fn parse_close_price(display: &str, body: &str) -> Result<f64, SourceError> {
    let records: Vec<Vec<&str>> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split(',').map(str::trim).collect())
        .collect();

    let Some(header) = records.first() else {
        return Err(SourceError::unavailable(format!(
            "empty quote response for {display:?}"
        )));
    };

    let has_header = header
        .first()
        .is_some_and(|cell| cell.eq_ignore_ascii_case("symbol"));

    let (row, close_index) = if has_header && records.len() > 1 {
        let index = header
            .iter()
            .position(|name| name.eq_ignore_ascii_case("close"));
        (&records[1], index)
    } else if header.len() > HEADERLESS_CLOSE_INDEX {
        (header, Some(HEADERLESS_CLOSE_INDEX))
    } else {
        (header, None)
    };

    let Some(close) = close_index.and_then(|index| row.get(index)) else {
        return Err(SourceError::unavailable(format!(
            "close price not found for symbol {display:?}"
        )));
    };

    if close.is_empty() || close.eq_ignore_ascii_case("N/D") {
        return Err(SourceError::unavailable(format!(
            "close price unavailable for symbol {display:?}"
        )));
    }

    close
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
        .ok_or_else(|| {
            SourceError::unavailable(format!(
                "invalid close price {close:?} for symbol {display:?}"
            ))
        })
}
