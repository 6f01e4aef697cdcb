//! Price snapshot providers.

use crate::domain::PriceSnapshot;
use async_trait::async_trait;
use std::fmt;

pub mod fixed;
pub mod upbit;

pub use fixed::StaticPriceSource;
pub use upbit::UpbitPriceSource;

/// Source of current unit prices for every active asset.
///
/// Implementations handle their own retry/backoff; the ranking run calls this once.
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Fetch a snapshot of asset-id → unit price.
    ///
    /// Assets the feed does not quote are simply absent from the snapshot.
    async fn fetch_prices(&self) -> Result<PriceSnapshot, PriceSourceError>;
}

/// Error type for price feed operations.
#[derive(Debug, Clone)]
pub enum PriceSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 4xx client error, 5xx server error)
    HttpError { status: u16, message: String },
    /// Invalid JSON or unexpected response shape
    ParseError(String),
    /// Rate limit exceeded after retries
    RateLimited,
}

impl fmt::Display for PriceSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PriceSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            PriceSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            PriceSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for PriceSourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_source_error_display() {
        let err = PriceSourceError::NetworkError("connection reset".to_string());
        assert_eq!(err.to_string(), "Network error: connection reset");

        let err = PriceSourceError::HttpError {
            status: 503,
            message: "Server error".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error 503: Server error");

        assert_eq!(PriceSourceError::RateLimited.to_string(), "Rate limited");
    }
}
