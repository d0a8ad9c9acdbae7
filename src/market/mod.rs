//! Market data API integration.
//!
//! This module provides a high-level interface to a CoinGecko-compatible
//! REST API, handling rate limiting and data conversion.

mod client;
mod converter;

pub use client::MarketClient;
pub use converter::DataConverter;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Current prices keyed by coin id, as observed at `fetched_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    prices: HashMap<String, Decimal>,
    fetched_at: DateTime<Utc>,
}

impl Default for PriceSnapshot {
    fn default() -> Self {
        Self {
            prices: HashMap::new(),
            fetched_at: Utc::now(),
        }
    }
}

impl PriceSnapshot {
    /// Create a snapshot from prices.
    pub fn new(prices: HashMap<String, Decimal>) -> Self {
        Self {
            prices,
            fetched_at: Utc::now(),
        }
    }

    /// Price for a coin, if the snapshot has one.
    pub fn price(&self, coin_id: &str) -> Option<Decimal> {
        self.prices.get(coin_id).copied()
    }

    /// When the snapshot was taken.
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Decimal)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (S, Decimal)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(id, p)| (id.into(), p)).collect())
    }
}

/// Source of current prices for the alert monitor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch current prices for `coin_ids`. Coins the source does not know
    /// are simply absent from the snapshot.
    async fn fetch_prices(&self, coin_ids: &[String]) -> Result<PriceSnapshot>;
}
