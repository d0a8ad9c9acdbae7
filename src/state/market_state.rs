//! Market-related state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A coin listing from the market data API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// API coin id (e.g. "bitcoin").
    pub id: String,
    /// Ticker symbol, lowercase as delivered.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Logo URL.
    pub image_url: Option<String>,
    /// Current price in the configured quote currency.
    pub current_price: Decimal,
    /// Market capitalisation.
    pub market_cap: Option<Decimal>,
    /// Rank by market cap.
    pub market_cap_rank: Option<u32>,
    /// 24h traded volume.
    pub total_volume: Option<Decimal>,
    /// 24h high.
    pub high_24h: Option<Decimal>,
    /// 24h low.
    pub low_24h: Option<Decimal>,
    /// 24h price change in percent.
    pub price_change_24h_percent: Option<Decimal>,
    /// When the API last refreshed this listing.
    pub last_updated: Option<DateTime<Utc>>,
}

impl Coin {
    /// Uppercase ticker for display.
    pub fn ticker(&self) -> String {
        self.symbol.to_uppercase()
    }

    /// Whether the coin gained over 24h. Unknown counts as flat.
    pub fn is_up(&self) -> bool {
        self.price_change_24h_percent
            .is_some_and(|change| change > Decimal::ZERO)
    }

    /// Whether the coin matches a search query (id, symbol or name).
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.id.contains(&query)
            || self.symbol.to_lowercase().contains(&query)
            || self.name.to_lowercase().contains(&query)
    }
}

/// A point of a historical price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Chart series for the selected coin.
#[derive(Debug, Clone, Default)]
pub struct ChartSeries {
    pub coin_id: String,
    pub days: u32,
    pub points: Vec<PricePoint>,
}

impl ChartSeries {
    /// Lowest and highest price in the series.
    pub fn bounds(&self) -> Option<(Decimal, Decimal)> {
        let first = self.points.first()?.price;
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (lo.min(p.price), hi.max(p.price))
        }))
    }

    /// Percent change from first to last point.
    pub fn change_percent(&self) -> Option<Decimal> {
        let first = self.points.first()?.price;
        let last = self.points.last()?.price;
        if first.is_zero() {
            None
        } else {
            Some((last - first) / first * Decimal::ONE_HUNDRED)
        }
    }
}

/// State for market-related data.
#[derive(Debug, Default)]
pub struct MarketState {
    /// Loaded coin listings.
    pub coins: Vec<Coin>,
    /// Currently selected coin index (into the filtered list).
    pub selected_index: Option<usize>,
    /// Search query filter.
    pub search_query: Option<String>,
    /// Current listing page (1-based).
    pub page: u32,
    /// Chart for the selected coin, if loaded.
    pub chart: Option<ChartSeries>,
    /// Whether coins are currently loading.
    pub loading: bool,
    /// Last update timestamp.
    pub last_updated: Option<DateTime<Utc>>,
}

impl MarketState {
    /// Get the currently selected coin.
    pub fn selected_coin(&self) -> Option<&Coin> {
        self.selected_index
            .and_then(|i| self.filtered_coins().get(i).copied())
    }

    /// Get coins matching the search filter.
    pub fn filtered_coins(&self) -> Vec<&Coin> {
        self.coins
            .iter()
            .filter(|c| match &self.search_query {
                Some(query) => c.matches(query),
                None => true,
            })
            .collect()
    }

    /// Look a coin up by id.
    pub fn coin(&self, id: &str) -> Option<&Coin> {
        self.coins.iter().find(|c| c.id == id)
    }

    /// Current page, never below 1.
    pub fn current_page(&self) -> u32 {
        self.page.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn coin(id: &str, symbol: &str, price: Decimal) -> Coin {
        Coin {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: id.to_string(),
            image_url: None,
            current_price: price,
            market_cap: None,
            market_cap_rank: None,
            total_volume: None,
            high_24h: None,
            low_24h: None,
            price_change_24h_percent: None,
            last_updated: None,
        }
    }

    #[test]
    fn test_search_filter() {
        let state = MarketState {
            coins: vec![
                coin("bitcoin", "btc", dec!(60000)),
                coin("ethereum", "eth", dec!(3000)),
            ],
            search_query: Some("ETH".to_string()),
            selected_index: Some(0),
            ..Default::default()
        };

        assert_eq!(state.filtered_coins().len(), 1);
        assert_eq!(state.selected_coin().map(|c| c.id.as_str()), Some("ethereum"));
    }

    #[test]
    fn test_chart_bounds_and_change() {
        let now = Utc::now();
        let series = ChartSeries {
            coin_id: "bitcoin".to_string(),
            days: 7,
            points: [dec!(100), dec!(80), dec!(150), dec!(120)]
                .into_iter()
                .map(|price| PricePoint { timestamp: now, price })
                .collect(),
        };

        assert_eq!(series.bounds(), Some((dec!(80), dec!(150))));
        assert_eq!(series.change_percent(), Some(dec!(20)));
        assert_eq!(ChartSeries::default().bounds(), None);
    }
}
