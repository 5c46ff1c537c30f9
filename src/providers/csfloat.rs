use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::price::{PriceQuote, PriceSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// CSFloat listings API, the primary price source. Public, no auth needed.
pub struct CsfloatSource {
    base_url: String,
}

impl CsfloatSource {
    pub fn new(base_url: &str) -> Self {
        CsfloatSource {
            base_url: base_url.to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ListingsResponse {
    data: Vec<Listing>,
}

#[derive(Deserialize, Debug)]
struct Listing {
    /// Listing price in cents.
    price: Option<u64>,
}

#[async_trait]
impl PriceSource for CsfloatSource {
    fn id(&self) -> &'static str {
        "csfloat"
    }

    #[instrument(
        name = "CsfloatQuery",
        skip(self),
        fields(item = %item_name)
    )]
    async fn query(&self, item_name: &str) -> Result<PriceQuote> {
        let url = format!("{}/api/v1/listings", self.base_url);
        debug!("Requesting listings from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("skinledger/1.0")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = client
            .get(&url)
            .query(&[
                ("market_hash_name", item_name),
                ("limit", "10"),
                ("sort_by", "lowest_price"),
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

        let data = response.json::<ListingsResponse>().await?;

        // Quote the average of the lowest three listings
        let cents: Vec<u64> = data
            .data
            .iter()
            .take(3)
            .filter_map(|listing| listing.price.filter(|p| *p > 0))
            .collect();

        if cents.is_empty() {
            return Err(anyhow!("No listings found for item: {}", item_name));
        }

        let avg = cents.iter().sum::<u64>() as f64 / cents.len() as f64 / 100.0;
        let price = (avg * 100.0).round() / 100.0;
        debug!(price, listings = cents.len(), "csfloat quote");

        Ok(PriceQuote {
            price,
            currency: "USD".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(item_name: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/listings"))
            .and(query_param("market_hash_name", item_name))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_averages_lowest_three_listings() {
        // Prices in cents: 10.00, 11.00, 12.00 averages to 11.00; the fourth
        // listing is past the window and ignored.
        let mock_response = r#"{
            "data": [
                {"price": 1000},
                {"price": 1100},
                {"price": 1200},
                {"price": 9900}
            ]
        }"#;

        let mock_server = create_mock_server("AK-47 | Redline", mock_response).await;
        let source = CsfloatSource::new(&mock_server.uri());

        let quote = source.query("AK-47 | Redline").await.unwrap();
        assert_eq!(quote.price, 11.0);
        assert_eq!(quote.currency, "USD");
    }

    #[tokio::test]
    async fn test_skips_zero_priced_listings() {
        let mock_response = r#"{"data": [{"price": 0}, {"price": 250}]}"#;
        let mock_server = create_mock_server("P250 | Sand Dune", mock_response).await;
        let source = CsfloatSource::new(&mock_server.uri());

        let quote = source.query("P250 | Sand Dune").await.unwrap();
        assert_eq!(quote.price, 2.5);
    }

    #[tokio::test]
    async fn test_no_listings_is_an_error() {
        let mock_server = create_mock_server("Unknown Item", r#"{"data": []}"#).await;
        let source = CsfloatSource::new(&mock_server.uri());

        let result = source.query("Unknown Item").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No listings found for item: Unknown Item"
        );
    }

    #[tokio::test]
    async fn test_http_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/listings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let source = CsfloatSource::new(&mock_server.uri());
        let result = source.query("AK-47 | Redline").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("HTTP error: 500"));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server =
            create_mock_server("AK-47 | Redline", r#"{"listings": []}"#).await;
        let source = CsfloatSource::new(&mock_server.uri());

        assert!(source.query("AK-47 | Redline").await.is_err());
    }
}
