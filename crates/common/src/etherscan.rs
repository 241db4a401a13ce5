use crate::types::{ApiTransaction, EtherscanResponse};
use anyhow::{Context, Result};
use reqwest::Url;
use std::time::Duration;

/// Etherscan answers `status = "0"` with this message when an address simply
/// has no history; that is an empty page, not an error.
const NO_TRANSACTIONS_MESSAGE: &str = "No transactions found";

pub struct EtherscanClient {
    http: reqwest::Client,
    api_url: String,
    chain_id: u64,
    api_key: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl EtherscanClient {
    pub fn new(api_url: &str, chain_id: u64, api_key: &str) -> Self {
        Self::new_with_settings(
            api_url,
            chain_id,
            api_key,
            Duration::from_secs(15),
            3,
            Duration::from_millis(500),
        )
    }

    pub fn new_with_settings(
        api_url: &str,
        chain_id: u64,
        api_key: &str,
        timeout: Duration,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            chain_id,
            api_key: api_key.to_string(),
            max_retries,
            backoff_base,
        }
    }

    pub fn from_config(cfg: &crate::config::Etherscan) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .with_context(|| format!("missing Etherscan API key in ${}", cfg.api_key_env))?;
        Ok(Self::new_with_settings(
            &cfg.api_url,
            cfg.chain_id,
            &api_key,
            Duration::from_secs(cfg.request_timeout_secs),
            cfg.max_retries,
            Duration::from_millis(cfg.backoff_base_ms),
        ))
    }

    /// `account/txlist` URL for one page, ascending by block. Contains the API key:
    /// never log it.
    pub fn txlist_url(&self, address: &str, page: u32, offset: u32) -> Result<Url> {
        let mut url = Url::parse(&self.api_url).context("etherscan api_url is not a valid URL")?;
        url.query_pairs_mut()
            .append_pair("chainid", &self.chain_id.to_string())
            .append_pair("module", "account")
            .append_pair("action", "txlist")
            .append_pair("address", address)
            .append_pair("startblock", "0")
            .append_pair("endblock", "99999999")
            .append_pair("page", &page.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("sort", "asc")
            .append_pair("apikey", &self.api_key);
        Ok(url)
    }

    /// Fetch one txlist page, retrying with exponential backoff.
    pub async fn fetch_txlist(
        &self,
        address: &str,
        page: u32,
        offset: u32,
    ) -> Result<Vec<ApiTransaction>> {
        let url = self.txlist_url(address, page, offset)?;
        let mut backoff = self.backoff_base;
        let mut attempt = 0;
        loop {
            match self.fetch_once(url.clone()).await {
                Ok(txs) => {
                    tracing::debug!(address, page, rows = txs.len(), "txlist page fetched");
                    return Ok(txs);
                }
                Err(err) if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        address,
                        page,
                        attempt,
                        wait_for = ?backoff,
                        error = %err,
                        "etherscan txlist request failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => {
                    return Err(err.context(format!(
                        "etherscan txlist failed for {address} page {page} after {attempt} retries"
                    )))
                }
            }
        }
    }

    async fn fetch_once(&self, url: Url) -> Result<Vec<ApiTransaction>> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        let body = resp.bytes().await?;
        parse_txlist_body(&body)
    }
}

pub fn parse_txlist_body(body: &[u8]) -> Result<Vec<ApiTransaction>> {
    let resp: EtherscanResponse =
        serde_json::from_slice(body).context("etherscan response is not valid JSON")?;
    if resp.status == "1" {
        return Ok(serde_json::from_value(resp.result)?);
    }
    if resp.message == NO_TRANSACTIONS_MESSAGE {
        return Ok(Vec::new());
    }
    let detail = resp
        .result
        .as_str()
        .map_or_else(|| resp.result.to_string(), str::to_string);
    anyhow::bail!("etherscan error: {} ({detail})", resp.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txlist_url_carries_paging_params() {
        let client = EtherscanClient::new("https://api.etherscan.io/v2/api/", 1, "KEY");
        let url = client.txlist_url("0xabc", 2, 1000).unwrap().to_string();
        assert!(url.starts_with("https://api.etherscan.io/v2/api?"));
        assert!(url.contains("chainid=1"));
        assert!(url.contains("action=txlist"));
        assert!(url.contains("address=0xabc"));
        assert!(url.contains("page=2"));
        assert!(url.contains("offset=1000"));
        assert!(url.contains("sort=asc"));
        assert!(url.contains("apikey=KEY"));
    }

    #[test]
    fn test_parse_ok_body() {
        let body = br#"{"status":"1","message":"OK","result":[{"hash":"0x1","timeStamp":"1700000000","value":"0","isError":"0","functionName":"borrow(uint256)"}]}"#;
        let txs = parse_txlist_body(body).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].function_name.as_deref(), Some("borrow(uint256)"));
    }

    #[test]
    fn test_parse_no_transactions_is_empty() {
        let body = br#"{"status":"0","message":"No transactions found","result":[]}"#;
        assert!(parse_txlist_body(body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_status_fails() {
        let body = br#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
        let err = parse_txlist_body(body).unwrap_err();
        assert!(err.to_string().contains("Max rate limit reached"));
    }
}
