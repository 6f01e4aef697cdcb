//! Upbit ticker client.

use super::{PriceSource, PriceSourceError};
use crate::domain::{AssetId, Decimal, PriceSnapshot};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use rust_decimal::Decimal as RustDecimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// One entry of `GET /v1/ticker/all`.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticker {
    /// Market code, e.g. `KRW-BTC`.
    pub market: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub trade_price: RustDecimal,
}

/// Price source backed by Upbit's public ticker endpoint.
///
/// Market codes are mapped to asset ids through the catalog's symbol map; markets
/// outside the map are ignored.
#[derive(Debug, Clone)]
pub struct UpbitPriceSource {
    client: Client,
    base_url: String,
    quote_currency: String,
    symbols: HashMap<String, AssetId>,
    retry_budget: Duration,
}

impl UpbitPriceSource {
    pub fn new(
        base_url: String,
        quote_currency: String,
        symbols: HashMap<String, AssetId>,
        retry_budget: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url,
            quote_currency,
            symbols,
            retry_budget,
        }
    }

    async fn get_tickers(&self) -> Result<Vec<Ticker>, PriceSourceError> {
        let url = format!("{}/v1/ticker/all", self.base_url.trim_end_matches('/'));
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.retry_budget),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(&url)
                .query(&[("quote_currencies", self.quote_currency.as_str())])
                .timeout(self.retry_budget)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(PriceSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(PriceSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(PriceSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response.json::<Vec<Ticker>>().await.map_err(|e| {
                backoff::Error::permanent(PriceSourceError::ParseError(e.to_string()))
            })
        })
        .await
    }
}

#[async_trait]
impl PriceSource for UpbitPriceSource {
    async fn fetch_prices(&self) -> Result<PriceSnapshot, PriceSourceError> {
        let tickers = self.get_tickers().await?;
        let snapshot = snapshot_from_tickers(&tickers, &self.symbols);

        debug!(
            tickers = tickers.len(),
            priced_assets = snapshot.len(),
            "Fetched ticker prices"
        );
        Ok(snapshot)
    }
}

/// Keep only tickers whose market is a known asset.
pub fn snapshot_from_tickers(
    tickers: &[Ticker],
    symbols: &HashMap<String, AssetId>,
) -> PriceSnapshot {
    tickers
        .iter()
        .filter_map(|t| {
            symbols
                .get(&t.market)
                .map(|&asset| (asset, Decimal::new(t.trade_price)))
        })
        .collect()
}
