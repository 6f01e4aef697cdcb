//! Price snapshot valid for exactly one ranking pass.

use crate::domain::{AssetId, Decimal};
use std::collections::HashMap;

/// Unit prices keyed by asset, captured once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceSnapshot {
    prices: HashMap<AssetId, Decimal>,
}

impl PriceSnapshot {
    pub fn new(prices: HashMap<AssetId, Decimal>) -> Self {
        Self { prices }
    }

    /// Snapshot with no prices; every position contributes zero.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn price_of(&self, asset: AssetId) -> Option<Decimal> {
        self.prices.get(&asset).copied()
    }

    pub fn insert(&mut self, asset: AssetId, price: Decimal) {
        self.prices.insert(asset, price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl FromIterator<(AssetId, Decimal)> for PriceSnapshot {
    fn from_iter<T: IntoIterator<Item = (AssetId, Decimal)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_lookup() {
        let snapshot: PriceSnapshot = [(AssetId::new(1), Decimal::from(100))]
            .into_iter()
            .collect();
        assert_eq!(snapshot.price_of(AssetId::new(1)), Some(Decimal::from(100)));
        assert_eq!(snapshot.price_of(AssetId::new(2)), None);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(PriceSnapshot::empty().is_empty());
    }
}
