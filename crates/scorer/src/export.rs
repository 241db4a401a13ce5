use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::ScoredWallet;

/// One output row; field order is the CSV column order.
#[derive(Debug, Serialize)]
struct ScoreRow<'a> {
    wallet_id: &'a str,
    deposit_count: u32,
    borrow_count: u32,
    repay_count: u32,
    redeem_count: u32,
    liquidation_count: u32,
    total_deposit_eth: f64,
    total_borrow_eth: f64,
    total_repay_eth: f64,
    total_redeem_eth: f64,
    failed_tx_count: u32,
    total_transactions: u32,
    avg_time_gap: f64,
    min_time_gap: f64,
    burst_count: u32,
    last_active_days_ago: u64,
    is_risky: u8,
    risk_score: u32,
}

impl<'a> From<&'a ScoredWallet> for ScoreRow<'a> {
    fn from(w: &'a ScoredWallet) -> Self {
        let f = &w.features;
        Self {
            wallet_id: &f.wallet_id,
            deposit_count: f.deposit_count,
            borrow_count: f.borrow_count,
            repay_count: f.repay_count,
            redeem_count: f.redeem_count,
            liquidation_count: f.liquidation_count,
            total_deposit_eth: f.total_deposit_eth,
            total_borrow_eth: f.total_borrow_eth,
            total_repay_eth: f.total_repay_eth,
            total_redeem_eth: f.total_redeem_eth,
            failed_tx_count: f.failed_tx_count,
            total_transactions: f.total_transactions,
            avg_time_gap: f.avg_time_gap,
            min_time_gap: f.min_time_gap,
            burst_count: f.burst_count,
            last_active_days_ago: f.last_active_days_ago,
            is_risky: u8::from(w.is_risky),
            risk_score: w.risk_score,
        }
    }
}

pub const SCORE_COLUMNS: [&str; 18] = [
    "wallet_id",
    "deposit_count",
    "borrow_count",
    "repay_count",
    "redeem_count",
    "liquidation_count",
    "total_deposit_eth",
    "total_borrow_eth",
    "total_repay_eth",
    "total_redeem_eth",
    "failed_tx_count",
    "total_transactions",
    "avg_time_gap",
    "min_time_gap",
    "burst_count",
    "last_active_days_ago",
    "is_risky",
    "risk_score",
];

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the scored table to a sibling temp file, then rename it into place.
pub fn write_scores(path: &Path, wallets: &[ScoredWallet]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&staging)?;
        wtr.write_record(SCORE_COLUMNS)?;
        for w in wallets {
            wtr.serialize(ScoreRow::from(w))?;
        }
        wtr.flush()?;
    }
    std::fs::rename(&staging, path)
        .with_context(|| format!("failed to move {} into place", staging.display()))?;
    Ok(())
}

/// `wallet_id: risk_score` per wallet, in table order.
pub fn write_report<W: Write>(out: &mut W, wallets: &[ScoredWallet], saved_to: &Path) -> Result<()> {
    for w in wallets {
        writeln!(out, "{}: {}", w.features.wallet_id, w.risk_score)?;
    }
    writeln!(out)?;
    writeln!(out, "Final scored table saved to '{}'.", saved_to.display())?;
    Ok(())
}
