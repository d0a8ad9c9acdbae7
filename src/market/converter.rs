//! Data conversion utilities for API responses.

use super::PriceSnapshot;
use crate::state::{Coin, PricePoint};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// A row of `/coins/markets`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<Decimal>,
    #[serde(default)]
    pub high_24h: Option<Decimal>,
    #[serde(default)]
    pub low_24h: Option<Decimal>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<Decimal>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Body of `/coins/{id}/market_chart`. Points are `[unix_ms, price]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMarketChart {
    pub prices: Vec<(f64, Option<Decimal>)>,
}

/// Body of `/simple/price`: coin id → currency → price.
pub type ApiSimplePrice = HashMap<String, HashMap<String, Option<Decimal>>>;

/// Converts API responses to internal state types.
pub struct DataConverter;

impl DataConverter {
    /// Convert an API coin row. Rows without a price are dropped.
    pub fn convert_coin(coin: ApiCoin) -> Option<Coin> {
        Some(Coin {
            current_price: coin.current_price?,
            id: coin.id,
            symbol: coin.symbol,
            name: coin.name,
            image_url: coin.image,
            market_cap: coin.market_cap,
            market_cap_rank: coin.market_cap_rank,
            total_volume: coin.total_volume,
            high_24h: coin.high_24h,
            low_24h: coin.low_24h,
            price_change_24h_percent: coin.price_change_percentage_24h,
            last_updated: coin.last_updated,
        })
    }

    /// Convert a simple-price body, keeping only `vs_currency` quotes.
    ///
    /// The API keys quotes by lowercase currency code.
    pub fn convert_simple_price(body: ApiSimplePrice, vs_currency: &str) -> PriceSnapshot {
        let currency = vs_currency.trim().to_ascii_lowercase();
        body.into_iter()
            .filter_map(|(id, quotes)| {
                let price = quotes.get(&currency).copied().flatten()?;
                Some((id, price))
            })
            .collect()
    }

    /// Convert a market-chart body into a price series.
    pub fn convert_chart(chart: ApiMarketChart) -> Vec<PricePoint> {
        chart
            .prices
            .into_iter()
            .filter_map(|(ms, price)| {
                Some(PricePoint {
                    timestamp: DateTime::from_timestamp_millis(ms as i64)?,
                    price: price?,
                })
            })
            .collect()
    }
}
