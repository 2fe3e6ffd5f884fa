use std::collections::HashMap;

use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::config::AppConfig;
use crate::error::{UpstreamError, UpstreamResult};
use crate::models::market::MarketQuote;
use crate::upstream::endpoints::COINGECKO_SIMPLE_PRICE;
use crate::upstream::ensure_success;

pub const PROVIDER: &str = "markets";
const COINGECKO: &str = "coingecko";
const YAHOO: &str = "yahoo-finance";

/// CoinGecko ids and the ticker/name we show for them.
const COINS: &[(&str, &str, &str)] = &[("bitcoin", "BTC", "Bitcoin"), ("ethereum", "ETH", "Ethereum")];

#[derive(Debug, Default, Deserialize)]
struct CoinPrice {
    #[serde(default)]
    usd: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: f64,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    short_name: Option<String>,
}

pub struct MarketsClient {
    http: Client,
    coingecko_url: String,
    yahoo_url: String,
    stocks: Vec<String>,
}

impl MarketsClient {
    pub fn new(http: Client, coingecko_url: impl Into<String>, yahoo_url: impl Into<String>, stocks: Vec<String>) -> Self {
        Self {
            http,
            coingecko_url: coingecko_url.into(),
            yahoo_url: yahoo_url.into(),
            stocks,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.coingecko_url.clone(),
            config.yahoo_finance_url.clone(),
            config.market_stocks.clone(),
        )
    }

    pub async fn fetch_crypto(&self) -> UpstreamResult<Vec<MarketQuote>> {
        let ids = COINS.iter().map(|(id, _, _)| *id).collect::<Vec<_>>().join(",");

        let response = self
            .http
            .get(format!("{}{}", self.coingecko_url, COINGECKO_SIMPLE_PRICE))
            .query(&[
                ("ids", ids.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await
            .map_err(UpstreamError::unreachable(COINGECKO))?;

        let response = ensure_success(COINGECKO, response).await?;
        let mut prices: HashMap<String, CoinPrice> =
            response.json().await.map_err(UpstreamError::decode(COINGECKO))?;

        Ok(COINS
            .iter()
            .map(|(id, symbol, name)| {
                let price = prices.remove(*id).unwrap_or_default();
                MarketQuote::Crypto {
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    price: price.usd.unwrap_or(0.0),
                    change_24h: price.usd_24h_change.unwrap_or(0.0),
                }
            })
            .collect())
    }

    /// `Ok(None)` when Yahoo knows nothing about the symbol.
    pub async fn fetch_stock(&self, symbol: &str) -> UpstreamResult<Option<MarketQuote>> {
        let response = self
            .http
            .get(format!("{}/{}", self.yahoo_url, urlencoding::encode(symbol)))
            .query(&[("interval", "1d"), ("range", "1d")])
            .send()
            .await
            .map_err(UpstreamError::unreachable(YAHOO))?;

        let response = ensure_success(YAHOO, response).await?;
        let chart: ChartResponse = response.json().await.map_err(UpstreamError::decode(YAHOO))?;

        let Some(meta) = chart.chart.result.and_then(|r| r.into_iter().next()).map(|r| r.meta) else {
            return Ok(None);
        };

        let price = meta.regular_market_price;
        let change = match meta.chart_previous_close.or(meta.previous_close) {
            Some(prev) if prev != 0.0 => (price - prev) / prev * 100.0,
            _ => 0.0,
        };

        Ok(Some(MarketQuote::Stock {
            symbol: symbol.to_string(),
            name: meta.short_name.unwrap_or_else(|| symbol.to_string()),
            price,
            change,
        }))
    }

    /// Crypto first, then stocks in configured order. A failing source is
    /// logged and left out; the rest is still returned.
    pub async fn fetch_all(&self) -> Vec<MarketQuote> {
        let stocks = join_all(self.stocks.iter().map(|s| self.fetch_stock(s)));
        let (crypto, stocks) = futures::join!(self.fetch_crypto(), stocks);

        let mut quotes = crypto.unwrap_or_else(|e| {
            warn!("Failed to fetch crypto prices: {}", e);
            Vec::new()
        });

        for (symbol, result) in self.stocks.iter().zip(stocks) {
            match result {
                Ok(Some(quote)) => quotes.push(quote),
                Ok(None) => warn!("No chart data for {}", symbol),
                Err(e) => warn!("Failed to fetch stock {}: {}", symbol, e),
            }
        }

        quotes
    }
}
