use anyhow::{Context, Result};
use common::etherscan::EtherscanClient;
use common::types::{ApiTransaction, WalletTransactionRow};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

/// Etherscan refuses `page * offset` beyond this many rows.
pub const MAX_RESULT_WINDOW: u32 = 10_000;

pub trait TxListPager {
    fn fetch_txlist_page(
        &self,
        address: &str,
        page: u32,
        offset: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ApiTransaction>>> + Send;
}

impl TxListPager for EtherscanClient {
    async fn fetch_txlist_page(
        &self,
        address: &str,
        page: u32,
        offset: u32,
    ) -> Result<Vec<ApiTransaction>> {
        let start = Instant::now();
        let res = self.fetch_txlist(address, page, offset).await;
        let ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::histogram!("scorer_api_latency_ms", "endpoint" => "txlist").record(ms);
        let status = if res.is_ok() { "ok" } else { "error" };
        metrics::counter!("scorer_api_requests_total", "endpoint" => "txlist", "status" => status)
            .increment(1);
        res
    }
}

/// All transactions of one wallet, oldest first. Stops on a short page or at
/// the API's result window.
pub async fn fetch_wallet_transactions<P: TxListPager + Sync>(
    pager: &P,
    address: &str,
    page_size: u32,
    delay: Duration,
) -> Result<Vec<ApiTransaction>> {
    let mut out = Vec::new();
    let mut page = 1_u32;
    loop {
        let txs = pager.fetch_txlist_page(address, page, page_size).await?;
        let page_len = txs.len();
        out.extend(txs);

        if page_len < page_size as usize {
            break;
        }
        if (page + 1).saturating_mul(page_size) > MAX_RESULT_WINDOW {
            tracing::warn!(
                address,
                rows = out.len(),
                "txlist result window reached; older history truncated"
            );
            break;
        }
        page += 1;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct WalletListRow {
    wallet_id: String,
}

/// Wallet ids trimmed and lower-cased; blanks and repeats dropped, first-seen order kept.
pub fn read_wallet_list(path: &Path) -> Result<Vec<String>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open wallet list {}", path.display()))?;
    let mut seen = HashSet::new();
    let mut wallets = Vec::new();
    for row in rdr.deserialize::<WalletListRow>() {
        let wallet = row?.wallet_id.trim().to_lowercase();
        if !wallet.is_empty() && seen.insert(wallet.clone()) {
            wallets.push(wallet);
        }
    }
    Ok(wallets)
}

/// Fetch every wallet's history and write one CSV tagged with `wallet_id`.
pub async fn run_fetch<P: TxListPager + Sync>(
    pager: &P,
    wallets: &[String],
    output: &Path,
    page_size: u32,
    delay: Duration,
) -> Result<usize> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let mut total = 0;
    for (i, wallet) in wallets.iter().enumerate() {
        tracing::info!(wallet = %wallet, n = i + 1, of = wallets.len(), "fetching transactions");
        let txs = fetch_wallet_transactions(pager, wallet, page_size, delay).await?;
        for tx in &txs {
            wtr.serialize(WalletTransactionRow::new(tx, wallet))?;
        }
        total += txs.len();
        if !delay.is_zero() && i + 1 < wallets.len() {
            tokio::time::sleep(delay).await;
        }
    }
    wtr.flush()?;

    tracing::info!(transactions = total, output = %output.display(), "raw transactions saved");
    Ok(total)
}
