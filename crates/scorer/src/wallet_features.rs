use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::action::{classify, Action};
use crate::ingestion::Transaction;

/// Consecutive transactions closer than this count as a burst.
pub const BURST_GAP_SECS: i64 = 120;
const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq)]
pub struct WalletFeatureVector {
    pub wallet_id: String,
    pub deposit_count: u32,
    pub borrow_count: u32,
    pub repay_count: u32,
    pub redeem_count: u32,
    pub liquidation_count: u32,
    pub total_deposit_eth: f64,
    pub total_borrow_eth: f64,
    pub total_repay_eth: f64,
    pub total_redeem_eth: f64,
    pub failed_tx_count: u32,
    pub total_transactions: u32,
    pub avg_time_gap: f64,
    pub min_time_gap: f64,
    pub burst_count: u32,
    pub last_active_days_ago: u64,
}

/// A transaction tagged with its action and ETH-scaled value.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedTransaction<'a> {
    pub tx: &'a Transaction,
    pub action: Action,
    pub value_eth: f64,
}

pub fn classify_transactions(
    txs: &[Transaction],
    strip_signatures: bool,
) -> Vec<ClassifiedTransaction<'_>> {
    txs.iter()
        .map(|tx| ClassifiedTransaction {
            tx,
            action: classify(tx.function_name.as_deref(), strip_signatures),
            value_eth: tx.value_eth(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGapStats {
    pub avg_gap_secs: f64,
    pub min_gap_secs: f64,
    pub burst_count: u32,
}

/// Gap statistics over consecutive (sorted) timestamps, in whole seconds.
/// Fewer than two timestamps yield all zeros.
pub fn time_gap_stats(timestamps: &mut [DateTime<Utc>]) -> TimeGapStats {
    if timestamps.len() < 2 {
        return TimeGapStats {
            avg_gap_secs: 0.0,
            min_gap_secs: 0.0,
            burst_count: 0,
        };
    }
    timestamps.sort_unstable();
    let gaps: Vec<i64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds())
        .collect();

    let sum: i64 = gaps.iter().sum();
    let min = gaps.iter().copied().min().unwrap_or(0);
    let bursts = gaps.iter().filter(|&&g| g < BURST_GAP_SECS).count();

    TimeGapStats {
        avg_gap_secs: sum as f64 / gaps.len() as f64,
        min_gap_secs: min as f64,
        burst_count: u32::try_from(bursts).unwrap_or(u32::MAX),
    }
}

/// Whole days from `last_seen` to `as_of`, floored; activity after `as_of` counts as 0.
pub fn days_since(as_of: DateTime<Utc>, last_seen: DateTime<Utc>) -> u64 {
    let secs = (as_of - last_seen).num_seconds();
    u64::try_from(secs.div_euclid(SECS_PER_DAY)).unwrap_or(0)
}

fn wallet_features(
    wallet_id: &str,
    rows: &[ClassifiedTransaction<'_>],
    as_of: DateTime<Utc>,
) -> WalletFeatureVector {
    let mut f = WalletFeatureVector {
        wallet_id: wallet_id.to_string(),
        deposit_count: 0,
        borrow_count: 0,
        repay_count: 0,
        redeem_count: 0,
        liquidation_count: 0,
        total_deposit_eth: 0.0,
        total_borrow_eth: 0.0,
        total_repay_eth: 0.0,
        total_redeem_eth: 0.0,
        failed_tx_count: 0,
        total_transactions: 0,
        avg_time_gap: 0.0,
        min_time_gap: 0.0,
        burst_count: 0,
        last_active_days_ago: 0,
    };

    for row in rows {
        match row.action {
            Action::Deposit => {
                f.deposit_count += 1;
                f.total_deposit_eth += row.value_eth;
            }
            Action::Borrow => {
                f.borrow_count += 1;
                f.total_borrow_eth += row.value_eth;
            }
            Action::Repay => {
                f.repay_count += 1;
                f.total_repay_eth += row.value_eth;
            }
            Action::Redeem => {
                f.redeem_count += 1;
                f.total_redeem_eth += row.value_eth;
            }
            Action::Liquidation => f.liquidation_count += 1,
            Action::Other => {}
        }
        if row.tx.is_error {
            f.failed_tx_count += 1;
        }
        f.total_transactions += 1;
    }

    let mut timestamps: Vec<DateTime<Utc>> = rows.iter().map(|r| r.tx.timestamp).collect();
    let gaps = time_gap_stats(&mut timestamps);
    f.avg_time_gap = gaps.avg_gap_secs;
    f.min_time_gap = gaps.min_gap_secs;
    f.burst_count = gaps.burst_count;

    if let Some(last_seen) = timestamps.iter().max() {
        f.last_active_days_ago = days_since(as_of, *last_seen);
    }
    f
}

/// One feature vector per distinct wallet, in ascending wallet order.
pub fn aggregate_wallet_features(
    rows: &[ClassifiedTransaction<'_>],
    as_of: DateTime<Utc>,
) -> Vec<WalletFeatureVector> {
    let mut by_wallet: BTreeMap<&str, Vec<ClassifiedTransaction<'_>>> = BTreeMap::new();
    for row in rows {
        by_wallet
            .entry(row.tx.wallet_id.as_str())
            .or_default()
            .push(*row);
    }
    by_wallet
        .iter()
        .map(|(wallet, rows)| wallet_features(wallet, rows, as_of))
        .collect()
}
