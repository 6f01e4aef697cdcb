//! In-memory price source for tests and offline runs.

use super::{PriceSource, PriceSourceError};
use crate::domain::{AssetId, Decimal, PriceSnapshot};
use async_trait::async_trait;

/// Returns a fixed snapshot, or a fixed error.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    snapshot: PriceSnapshot,
    failure: Option<PriceSourceError>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quote an asset at the given unit price.
    pub fn with_price(mut self, asset: AssetId, price: Decimal) -> Self {
        self.snapshot.insert(asset, price);
        self
    }

    /// Make every fetch fail with the given error.
    pub fn failing(error: PriceSourceError) -> Self {
        Self {
            snapshot: PriceSnapshot::empty(),
            failure: Some(error),
        }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_prices(&self) -> Result<PriceSnapshot, PriceSourceError> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.snapshot.clone()),
        }
    }
}
