use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::price::{PriceQuote, PriceSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Steam app id for CS2.
const APP_ID: &str = "730";
/// Steam currency code for USD.
const CURRENCY_USD: &str = "1";

/// Steam Community Market price overview, the fallback source. Rate-limited
/// upstream, so the resolver only reaches for it when CSFloat has nothing.
pub struct SteamMarketSource {
    base_url: String,
}

impl SteamMarketSource {
    pub fn new(base_url: &str) -> Self {
        SteamMarketSource {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct PriceOverviewResponse {
    #[serde(default)]
    success: bool,
    lowest_price: Option<String>,
    median_price: Option<String>,
}

/// Parses Steam's display prices ("$1.23", "1,234.56") into a float.
fn parse_display_price(text: &str) -> Result<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| anyhow!("Unparseable price string: '{}'", text))
}

#[async_trait]
impl PriceSource for SteamMarketSource {
    fn id(&self) -> &'static str {
        "steam_market"
    }

    #[instrument(
        name = "SteamMarketQuery",
        skip(self),
        fields(item = %item_name)
    )]
    async fn query(&self, item_name: &str) -> Result<PriceQuote> {
        let url = format!("{}/market/priceoverview/", self.base_url);
        debug!("Requesting price overview from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("skinledger/1.0")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = client
            .get(&url)
            .query(&[
                ("appid", APP_ID),
                ("currency", CURRENCY_USD),
                ("market_hash_name", item_name),
            ])
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for item: {}", e, item_name))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for item: {}",
                response.status(),
                item_name
            ));
        }

        let text = response.text().await?;
        let data: PriceOverviewResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", item_name, e))?;

        if !data.success {
            return Err(anyhow!("Steam market reported failure for: {}", item_name));
        }

        let price_str = data
            .lowest_price
            .or(data.median_price)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("No price data found for item: {}", item_name))?;

        let price = parse_display_price(&price_str)?;
        debug!(price, "steam market quote");

        Ok(PriceQuote {
            price,
            currency: "USD".to_string(),
        })
    }
}
