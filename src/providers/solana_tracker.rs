use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{PriceRange, PriceRangeSource};

const RANGE_PATH: &str = "/price/history/range";

/// Solana Tracker historical price range client.
#[derive(Clone)]
pub struct SolanaTrackerClient {
    client: Client,
    range_url: Url,
    api_key: String,
}

/// Either `{ "price": { "highest": .., "lowest": .. } }` or `{ "error": ".." }`.
#[derive(Debug, Deserialize)]
struct RangeResponse {
    error: Option<String>,
    price: Option<PriceRange>,
}

impl RangeResponse {
    fn into_range(self) -> Result<PriceRange> {
        if let Some(error) = self.error {
            bail!("Solana Tracker API error: {}", error);
        }
        self.price
            .ok_or_else(|| anyhow!("Solana Tracker response has no price range"))
    }
}

impl SolanaTrackerClient {
    pub fn new(client: Client, base_url: &str, api_key: String) -> Result<Self> {
        let range_url = Url::parse(base_url)
            .and_then(|base| base.join(RANGE_PATH))
            .with_context(|| format!("Invalid Solana Tracker base URL: {}", base_url))?;

        Ok(Self {
            client,
            range_url,
            api_key,
        })
    }

    fn range_request_url(&self, token_id: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Url {
        let mut url = self.range_url.clone();
        url.query_pairs_mut()
            .append_pair("token", token_id)
            .append_pair("time_from", &from.timestamp().to_string())
            .append_pair("time_to", &to.timestamp().to_string());
        url
    }
}

#[async_trait]
impl PriceRangeSource for SolanaTrackerClient {
    async fn range(
        &self,
        token_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<PriceRange> {
        let response = self
            .client
            .get(self.range_request_url(token_id, from, to))
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .context("Solana Tracker request failed")?;

        let status = response.status();
        let body: RangeResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to decode Solana Tracker response ({})", status))?;

        if !status.is_success() && body.error.is_none() {
            bail!("Solana Tracker API error: {}", status);
        }

        body.into_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_request_url() {
        let client = SolanaTrackerClient::new(
            Client::new(),
            "https://data.solanatracker.io",
            "key".into(),
        )
        .unwrap();
        let to = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let from = to - chrono::Duration::days(30);

        let url = client.range_request_url("mint", from, to);
        assert_eq!(
            url.as_str(),
            "https://data.solanatracker.io/price/history/range?token=mint&time_from=1697408000&time_to=1700000000"
        );
    }

    #[test]
    fn test_decode_range() {
        let body = r#"{
            "token": "mint",
            "price": {
                "highest": { "price": 0.0042, "marketcap": 4200000, "time": 1699990000 },
                "lowest": { "price": 0.0003, "marketcap": 300000, "time": 1699000000 }
            }
        }"#;

        let range = serde_json::from_str::<RangeResponse>(body)
            .unwrap()
            .into_range()
            .unwrap();

        assert_eq!(range.highest.price, 0.0042);
        assert_eq!(range.highest.market_cap, 4_200_000.0);
        assert_eq!(range.lowest.time, 1_699_000_000);
    }

    #[test]
    fn test_error_body_is_an_error() {
        let body = r#"{ "error": "Token not found" }"#;
        let result = serde_json::from_str::<RangeResponse>(body)
            .unwrap()
            .into_range();

        assert!(result.unwrap_err().to_string().contains("Token not found"));
    }
}
