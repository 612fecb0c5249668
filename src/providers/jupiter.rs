use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{PriceQuoteSource, TokenQuote};
use crate::db::models::WindowStats;

const SEARCH_PATH: &str = "/tokens/v2/search";

/// Jupiter token search client.
///
/// `GET /tokens/v2/search?query=<mint>` returns an array of matches; the
/// first element is the token itself when the query is a mint address.
#[derive(Clone)]
pub struct JupiterClient {
    client: Client,
    search_url: Url,
    api_key: String,
}

/// Subset of a token search result the scanner uses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    usd_price: Option<f64>,
    mcap: Option<f64>,
    holder_count: Option<u64>,
    organic_score: Option<f64>,
    stats_1h: Option<WindowStats>,
    stats_6h: Option<WindowStats>,
    stats_24h: Option<WindowStats>,
}

impl From<SearchResult> for TokenQuote {
    fn from(token: SearchResult) -> Self {
        Self {
            id: token.id,
            name: token.name,
            symbol: token.symbol,
            // A listed token without a price is treated as worthless
            price: token.usd_price.unwrap_or(0.0),
            market_cap: token.mcap.unwrap_or(0.0),
            holder_count: token.holder_count,
            organic_score: token.organic_score,
            stats_1h: token.stats_1h,
            stats_6h: token.stats_6h,
            stats_24h: token.stats_24h,
        }
    }
}

impl JupiterClient {
    pub fn new(client: Client, base_url: &str, api_key: String) -> Result<Self> {
        let search_url = Url::parse(base_url)
            .and_then(|base| base.join(SEARCH_PATH))
            .with_context(|| format!("Invalid Jupiter base URL: {}", base_url))?;

        Ok(Self {
            client,
            search_url,
            api_key,
        })
    }

    async fn search(&self, token_id: &str) -> Result<Vec<SearchResult>> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut().append_pair("query", token_id);

        let response = self
            .client
            .get(url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .context("Jupiter request failed")?;

        if !response.status().is_success() {
            bail!("Jupiter API error: {}", response.status());
        }

        response
            .json::<Vec<SearchResult>>()
            .await
            .context("Failed to decode Jupiter search response")
    }
}

#[async_trait]
impl PriceQuoteSource for JupiterClient {
    async fn quote(&self, token_id: &str) -> Result<Option<TokenQuote>> {
        let results = self.search(token_id).await?;
        Ok(results.into_iter().next().map(TokenQuote::from))
    }
}
