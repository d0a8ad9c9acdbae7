//! Market data REST client.

use super::converter::{ApiCoin, ApiMarketChart, ApiSimplePrice};
use super::{DataConverter, PriceSnapshot, PriceSource};
use crate::config::MarketApiConfig;
use crate::error::{Error, Result};
use crate::state::{Coin, PricePoint};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// Seconds to back off when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// High-level client for the market data API.
#[derive(Clone)]
pub struct MarketClient {
    /// Configuration.
    config: MarketApiConfig,
    /// Validated base URL.
    base_url: Url,
    /// HTTP client.
    http: reqwest::Client,
    /// Rate limiter state, shared between clones.
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl MarketClient {
    /// Create a new market data client.
    pub fn new(mut config: MarketApiConfig) -> Result<Self> {
        config.vs_currency = config.vs_currency.trim().to_ascii_lowercase();
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::config(format!("invalid api.base_url: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("hodlr/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(config.rate_limit))),
            config,
            base_url,
            http,
        })
    }

    /// Test connection to the API.
    pub async fn test_connection(&self) -> Result<bool> {
        let _: serde_json::Value = self.get_json("ping", &[]).await?;
        Ok(true)
    }

    /// Fetch one page of coin listings ordered by market cap.
    pub async fn fetch_coins(&self, page: u32) -> Result<Vec<Coin>> {
        let query = [
            ("vs_currency", self.config.vs_currency.clone()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", self.config.per_page.to_string()),
            ("page", page.max(1).to_string()),
            ("sparkline", "false".to_string()),
        ];
        let rows: Vec<ApiCoin> = self.get_json("coins/markets", &query).await?;

        Ok(rows
            .into_iter()
            .filter_map(DataConverter::convert_coin)
            .collect())
    }

    /// Fetch current prices for the given coins.
    pub async fn fetch_prices(&self, coin_ids: &[String]) -> Result<PriceSnapshot> {
        if coin_ids.is_empty() {
            return Ok(PriceSnapshot::default());
        }

        let query = [
            ("ids", coin_ids.join(",")),
            ("vs_currencies", self.config.vs_currency.clone()),
        ];
        let body: ApiSimplePrice = self.get_json("simple/price", &query).await?;

        Ok(DataConverter::convert_simple_price(
            body,
            &self.config.vs_currency,
        ))
    }

    /// Fetch a historical price series covering `days` days.
    pub async fn fetch_chart(&self, coin_id: &str, days: u32) -> Result<Vec<PricePoint>> {
        if coin_id.is_empty() {
            return Err(Error::validation("coin id must not be empty"));
        }

        let query = [
            ("vs_currency", self.config.vs_currency.clone()),
            ("days", days.max(1).to_string()),
        ];
        let chart: ApiMarketChart = self
            .get_json(&format!("coins/{}/market_chart", coin_id), &query)
            .await?;

        Ok(DataConverter::convert_chart(chart))
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.rate_limit().await;

        let mut request = self.http.get(self.endpoint(path)).query(query);
        if let Some(key) = &self.config.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        tracing::debug!(path, "market api request");
        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                Error::network(e.to_string())
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(Error::RateLimited(retry_after));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Apply rate limiting.
    async fn rate_limit(&self) {
        let mut limiter = self.rate_limiter.lock().await;
        limiter.wait().await;
    }
}

#[async_trait]
impl PriceSource for MarketClient {
    async fn fetch_prices(&self, coin_ids: &[String]) -> Result<PriceSnapshot> {
        MarketClient::fetch_prices(self, coin_ids).await
    }
}

/// Simple token-bucket rate limiter.
struct RateLimiter {
    requests_per_second: u32,
    last_request: std::time::Instant,
    tokens: f64,
}

impl RateLimiter {
    fn new(requests_per_second: u32) -> Self {
        let requests_per_second = requests_per_second.max(1);
        Self {
            requests_per_second,
            last_request: std::time::Instant::now(),
            tokens: requests_per_second as f64,
        }
    }

    async fn wait(&mut self) {
        let now = std::time::Instant::now();
        let elapsed = now.duration_since(self.last_request).as_secs_f64();
        let rate = self.requests_per_second as f64;

        // Replenish tokens
        self.tokens = (self.tokens + elapsed * rate).min(rate);

        if self.tokens < 1.0 {
            let wait_time = (1.0 - self.tokens) / rate;
            tokio::time::sleep(std::time::Duration::from_secs_f64(wait_time)).await;
            self.tokens = 1.0;
        }

        self.tokens -= 1.0;
        self.last_request = std::time::Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        let client = MarketClient::new(MarketApiConfig {
            base_url: "https://api.example.com/api/v3/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint("/coins/markets"),
            "https://api.example.com/api/v3/coins/markets"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = MarketClient::new(MarketApiConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_price_request_skips_network() {
        let client = MarketClient::new(MarketApiConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
        .unwrap();
        let snapshot = client.fetch_prices(&[]).await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limiter_spends_tokens() {
        let mut limiter = RateLimiter::new(2);
        limiter.wait().await;
        limiter.wait().await;
        assert!(limiter.tokens < 1.0);
    }
}
