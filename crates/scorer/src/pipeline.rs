use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::config::{Config, RiskRules, Scoring};
use std::collections::BTreeMap;
use std::path::Path;

use crate::export;
use crate::ingestion::{self, Transaction};
use crate::wallet_features::{aggregate_wallet_features, classify_transactions, WalletFeatureVector};
use crate::wallet_rules_engine::{evaluate_risk, RiskReason};
use crate::wallet_scoring::{compute_risk_scores, BatchStats, RiskScoreWeights, ScoringFeature};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWallet {
    pub features: WalletFeatureVector,
    pub is_risky: bool,
    pub risk_reason: RiskReason,
    pub risk_score: u32,
}

#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub wallets: Vec<ScoredWallet>,
    /// `None` only for an empty batch.
    pub stats: Option<BatchStats>,
}

impl ScoredBatch {
    pub fn reason_counts(&self) -> BTreeMap<RiskReason, usize> {
        let mut counts = BTreeMap::new();
        for w in &self.wallets {
            *counts.entry(w.risk_reason).or_insert(0) += 1;
        }
        counts
    }
}

/// classify -> aggregate -> label -> batch stats -> score.
pub fn score_transactions(
    transactions: &[Transaction],
    as_of: DateTime<Utc>,
    rules: &RiskRules,
    scoring: &Scoring,
    strip_signatures: bool,
) -> ScoredBatch {
    let classified = classify_transactions(transactions, strip_signatures);
    let features = aggregate_wallet_features(&classified, as_of);

    let weights = RiskScoreWeights::from_config(scoring);
    let stats = match &scoring.calibration {
        Some(c) => Some(BatchStats::from_calibration(c)),
        None => BatchStats::from_batch(&features, &weights),
    };
    let scores = match &stats {
        Some(stats) => compute_risk_scores(&features, &weights, stats),
        None => Vec::new(),
    };

    let wallets = features
        .into_iter()
        .zip(scores)
        .map(|(features, risk_score)| {
            let decision = evaluate_risk(&features, rules);
            ScoredWallet {
                features,
                is_risky: decision.risky,
                risk_reason: decision.reason,
                risk_score,
            }
        })
        .collect();

    ScoredBatch { wallets, stats }
}

pub fn resolve_as_of(cfg_as_of: Option<&str>) -> Result<DateTime<Utc>> {
    match cfg_as_of {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("pipeline.as_of is not RFC 3339: {s}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

/// Read, score, export and report. Nothing is written unless the whole table scored.
pub fn run_score(cfg: &Config, input: &Path, output: &Path) -> Result<ScoredBatch> {
    let as_of = resolve_as_of(cfg.pipeline.as_of.as_deref())?;
    tracing::info!(input = %input.display(), %as_of, "scoring transactions");

    let transactions = ingestion::read_transactions(input)
        .with_context(|| format!("failed to ingest {}", input.display()))?;
    metrics::counter!("scorer_transactions_ingested_total").increment(transactions.len() as u64);

    let batch = score_transactions(
        &transactions,
        as_of,
        &cfg.rules,
        &cfg.scoring,
        cfg.pipeline.strip_signatures,
    );
    if batch.wallets.is_empty() {
        tracing::warn!(input = %input.display(), "no transactions; writing an empty table");
    }

    metrics::counter!("scorer_wallets_scored_total").increment(batch.wallets.len() as u64);
    for (reason, count) in batch.reason_counts() {
        if reason.is_risky() {
            metrics::counter!("scorer_risky_wallets_total", "reason" => reason.as_str())
                .increment(count as u64);
        }
        tracing::info!(reason = reason.as_str(), wallets = count, "risk labels");
    }
    if let Some(stats) = &batch.stats {
        tracing::info!(
            raw_score_min = stats.raw_score_min,
            raw_score_max = stats.raw_score_max,
            calibrated = cfg.scoring.calibration.is_some(),
            "batch stats"
        );
        for feature in ScoringFeature::ALL {
            tracing::debug!(
                feature = feature.as_str(),
                column_max = stats.column_max(feature),
                "batch column max"
            );
        }
    }

    export::write_scores(output, &batch.wallets)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let stdout = std::io::stdout();
    export::write_report(&mut stdout.lock(), &batch.wallets, output)?;

    tracing::info!(
        transactions = transactions.len(),
        wallets = batch.wallets.len(),
        output = %output.display(),
        "scoring complete"
    );
    Ok(batch)
}
