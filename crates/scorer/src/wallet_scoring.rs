use crate::wallet_features::WalletFeatureVector;
use common::config::{Calibration, Scoring};

pub const MIN_RISK_SCORE: u32 = 200;
pub const MAX_RISK_SCORE: u32 = 1000;

/// Feature columns that feed the risk score, in accumulation order
/// (positive contributors first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringFeature {
    BorrowCount,
    LiquidationCount,
    FailedTxCount,
    BurstCount,
    TotalTransactions,
    RepayCount,
}

impl ScoringFeature {
    pub const ALL: [Self; 6] = [
        Self::BorrowCount,
        Self::LiquidationCount,
        Self::FailedTxCount,
        Self::BurstCount,
        Self::TotalTransactions,
        Self::RepayCount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BorrowCount => "borrow_count",
            Self::LiquidationCount => "liquidation_count",
            Self::FailedTxCount => "failed_tx_count",
            Self::BurstCount => "burst_count",
            Self::TotalTransactions => "total_transactions",
            Self::RepayCount => "repay_count",
        }
    }

    pub fn value(self, f: &WalletFeatureVector) -> f64 {
        let v = match self {
            Self::BorrowCount => f.borrow_count,
            Self::LiquidationCount => f.liquidation_count,
            Self::FailedTxCount => f.failed_tx_count,
            Self::BurstCount => f.burst_count,
            Self::TotalTransactions => f.total_transactions,
            Self::RepayCount => f.repay_count,
        };
        f64::from(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScoreWeights {
    pub borrow_count: f64,
    pub liquidation_count: f64,
    pub failed_tx_count: f64,
    pub burst_count: f64,
    pub total_transactions: f64,
    pub repay_count: f64,
}

impl Default for RiskScoreWeights {
    fn default() -> Self {
        Self::from_config(&Scoring::default())
    }
}

impl RiskScoreWeights {
    pub fn from_config(s: &Scoring) -> Self {
        Self {
            borrow_count: s.borrow_count_weight,
            liquidation_count: s.liquidation_count_weight,
            failed_tx_count: s.failed_tx_count_weight,
            burst_count: s.burst_count_weight,
            total_transactions: s.total_transactions_weight,
            repay_count: s.repay_count_weight,
        }
    }

    pub fn weight(&self, feature: ScoringFeature) -> f64 {
        match feature {
            ScoringFeature::BorrowCount => self.borrow_count,
            ScoringFeature::LiquidationCount => self.liquidation_count,
            ScoringFeature::FailedTxCount => self.failed_tx_count,
            ScoringFeature::BurstCount => self.burst_count,
            ScoringFeature::TotalTransactions => self.total_transactions,
            ScoringFeature::RepayCount => self.repay_count,
        }
    }
}

/// Normalization constants a score is computed against.
///
/// Taken from the batch itself by default, which makes scores batch-relative;
/// a fixed `Calibration` makes them comparable across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    /// Column maxima, in `ScoringFeature::ALL` order.
    pub column_max: [f64; 6],
    pub raw_score_min: f64,
    pub raw_score_max: f64,
}

impl BatchStats {
    /// `None` for an empty batch.
    pub fn from_batch(features: &[WalletFeatureVector], weights: &RiskScoreWeights) -> Option<Self> {
        if features.is_empty() {
            return None;
        }
        let mut column_max = [0.0_f64; 6];
        for (slot, feature) in column_max.iter_mut().zip(ScoringFeature::ALL) {
            *slot = features
                .iter()
                .map(|f| feature.value(f))
                .fold(f64::NEG_INFINITY, f64::max);
        }

        let mut stats = Self {
            column_max,
            raw_score_min: 0.0,
            raw_score_max: 0.0,
        };
        let raw: Vec<f64> = features
            .iter()
            .map(|f| raw_score(f, weights, &stats))
            .collect();
        stats.raw_score_min = raw.iter().copied().fold(f64::INFINITY, f64::min);
        stats.raw_score_max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(stats)
    }

    pub fn from_calibration(c: &Calibration) -> Self {
        Self {
            column_max: [
                c.borrow_count_max,
                c.liquidation_count_max,
                c.failed_tx_count_max,
                c.burst_count_max,
                c.total_transactions_max,
                c.repay_count_max,
            ],
            raw_score_min: c.raw_score_min,
            raw_score_max: c.raw_score_max,
        }
    }

    pub fn column_max(&self, feature: ScoringFeature) -> f64 {
        ScoringFeature::ALL
            .iter()
            .position(|f| *f == feature)
            .map_or(0.0, |i| self.column_max[i])
    }
}

/// Divide by the column maximum; an all-zero column stays as is.
pub fn normalize(value: f64, column_max: f64) -> f64 {
    if column_max == 0.0 {
        value
    } else {
        value / column_max
    }
}

/// Weighted sum of max-normalized features, before min-max rescaling.
pub fn raw_score(f: &WalletFeatureVector, weights: &RiskScoreWeights, stats: &BatchStats) -> f64 {
    ScoringFeature::ALL
        .iter()
        .zip(stats.column_max)
        .fold(0.0, |acc, (feature, max)| {
            acc + normalize(feature.value(f), max) * weights.weight(*feature)
        })
}

/// Min-max normalize into [0, 1], then map onto [200, 1000] and truncate.
pub fn rescale(raw: f64, stats: &BatchStats) -> u32 {
    let span = stats.raw_score_max - stats.raw_score_min;
    let unit = if span == 0.0 {
        0.0
    } else {
        (raw - stats.raw_score_min) / span
    };
    let scaled = unit * f64::from(MAX_RISK_SCORE - MIN_RISK_SCORE) + f64::from(MIN_RISK_SCORE);
    if !scaled.is_finite() {
        return MIN_RISK_SCORE;
    }
    scaled.clamp(f64::from(MIN_RISK_SCORE), f64::from(MAX_RISK_SCORE)) as u32
}

pub fn compute_risk_scores(
    features: &[WalletFeatureVector],
    weights: &RiskScoreWeights,
    stats: &BatchStats,
) -> Vec<u32> {
    features
        .iter()
        .map(|f| rescale(raw_score(f, weights, stats), stats))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(id: &str, borrow: u32, liq: u32, failed: u32, burst: u32, total: u32, repay: u32) -> WalletFeatureVector {
        WalletFeatureVector {
            wallet_id: id.to_string(),
            deposit_count: 0,
            borrow_count: borrow,
            repay_count: repay,
            redeem_count: 0,
            liquidation_count: liq,
            total_deposit_eth: 0.0,
            total_borrow_eth: 0.0,
            total_repay_eth: 0.0,
            total_redeem_eth: 0.0,
            failed_tx_count: failed,
            total_transactions: total,
            avg_time_gap: 0.0,
            min_time_gap: 0.0,
            burst_count: burst,
            last_active_days_ago: 0,
        }
    }

    fn score_batch(features: &[WalletFeatureVector]) -> Vec<u32> {
        let w = RiskScoreWeights::default();
        let stats = BatchStats::from_batch(features, &w).unwrap();
        compute_risk_scores(features, &w, &stats)
    }

    #[test]
    fn test_single_wallet_scores_minimum() {
        assert_eq!(score_batch(&[wallet("0xa", 5, 1, 3, 9, 40, 2)]), vec![200]);
    }

    #[test]
    fn test_identical_wallets_score_minimum() {
        let w = wallet("0xa", 1, 0, 0, 0, 3, 1);
        let mut other = w.clone();
        other.wallet_id = "0xb".to_string();
        assert_eq!(score_batch(&[w, other]), vec![200, 200]);
    }

    #[test]
    fn test_riskiest_gets_1000_and_safest_200() {
        let features = vec![
            wallet("risky", 10, 2, 8, 30, 50, 0),
            wallet("safe", 0, 0, 0, 0, 100, 10),
            wallet("middle", 5, 0, 2, 5, 60, 5),
        ];
        let scores = score_batch(&features);
        assert_eq!(scores[0], 1000);
        assert_eq!(scores[1], 200);
        assert!(scores[2] > 200 && scores[2] < 1000);
    }

    #[test]
    fn test_known_two_wallet_batch() {
        // a: borrow 1/1*40 + total 1/2*-20 = 30; b: total 2/2*-20 + repay 1/1*-30 = -50
        let features = vec![
            wallet("a", 1, 0, 0, 0, 1, 0),
            wallet("b", 0, 0, 0, 0, 2, 1),
        ];
        let w = RiskScoreWeights::default();
        let stats = BatchStats::from_batch(&features, &w).unwrap();
        assert!((stats.raw_score_max - 30.0).abs() < 1e-9);
        assert!((stats.raw_score_min + 50.0).abs() < 1e-9);
        assert!((stats.column_max(ScoringFeature::TotalTransactions) - 2.0).abs() < 1e-12);
        assert_eq!(stats.column_max(ScoringFeature::LiquidationCount), 0.0);
        assert_eq!(compute_risk_scores(&features, &w, &stats), vec![1000, 200]);
    }

    #[test]
    fn test_scores_truncate_not_round() {
        // raw: a = 40, b = 0, c = 40 * 0.999 -> unit 0.999 -> 999.2
        let features = vec![
            wallet("a", 1000, 0, 0, 0, 0, 0),
            wallet("b", 0, 0, 0, 0, 0, 0),
            wallet("c", 999, 0, 0, 0, 0, 0),
        ];
        assert_eq!(score_batch(&features)[2], 999);
    }

    #[test]
    fn test_scores_always_in_range() {
        let features: Vec<WalletFeatureVector> = (0..25u32)
            .map(|i| wallet(&format!("0x{i}"), i % 4, i % 3 / 2, i % 7, i * 3 % 11, i + 1, i % 5))
            .collect();
        for s in score_batch(&features) {
            assert!((MIN_RISK_SCORE..=MAX_RISK_SCORE).contains(&s));
        }
    }

    #[test]
    fn test_feature_names_are_output_columns() {
        for feature in ScoringFeature::ALL {
            assert!(
                crate::export::SCORE_COLUMNS.contains(&feature.as_str()),
                "{}",
                feature.as_str()
            );
        }
        let stats = BatchStats::from_batch(
            &[wallet("0xa", 3, 0, 1, 0, 4, 2), wallet("0xb", 1, 0, 0, 0, 9, 0)],
            &RiskScoreWeights::default(),
        )
        .unwrap();
        let by_name: Vec<(&str, f64)> = ScoringFeature::ALL
            .iter()
            .map(|f| (f.as_str(), stats.column_max(*f)))
            .collect();
        assert_eq!(by_name[0], ("borrow_count", 3.0));
        assert_eq!(by_name[4], ("total_transactions", 9.0));
        assert_eq!(by_name[5], ("repay_count", 2.0));
    }

    #[test]
    fn test_empty_batch_has_no_stats() {
        assert!(BatchStats::from_batch(&[], &RiskScoreWeights::default()).is_none());
    }

    #[test]
    fn test_zero_column_is_left_unnormalized() {
        assert_eq!(normalize(0.0, 0.0), 0.0);
        assert!((normalize(3.0, 4.0) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_calibrated_scores_do_not_depend_on_batch() {
        let calibration = Calibration {
            borrow_count_max: 10.0,
            liquidation_count_max: 1.0,
            failed_tx_count_max: 10.0,
            burst_count_max: 10.0,
            total_transactions_max: 100.0,
            repay_count_max: 10.0,
            raw_score_min: -50.0,
            raw_score_max: 140.0,
        };
        let stats = BatchStats::from_calibration(&calibration);
        let w = RiskScoreWeights::default();
        let target = wallet("t", 5, 0, 0, 0, 50, 5);

        let alone = compute_risk_scores(std::slice::from_ref(&target), &w, &stats);
        let with_others = compute_risk_scores(
            &[target.clone(), wallet("x", 10, 1, 10, 10, 5, 0)],
            &w,
            &stats,
        );
        assert_eq!(alone[0], with_others[0]);
        // raw = 20 - 10 - 15 = -5 -> unit 45/190 -> 389.47
        assert_eq!(alone[0], 389);
    }

    #[test]
    fn test_out_of_calibration_values_are_clipped() {
        let stats = BatchStats {
            column_max: [1.0; 6],
            raw_score_min: 0.0,
            raw_score_max: 10.0,
        };
        let w = RiskScoreWeights::default();
        let heavy = wallet("h", 100, 100, 100, 100, 0, 0);
        assert_eq!(compute_risk_scores(&[heavy], &w, &stats), vec![1000]);
        let light = wallet("l", 0, 0, 0, 0, 100, 100);
        assert_eq!(compute_risk_scores(&[light], &w, &stats), vec![200]);
    }

    #[test]
    fn test_custom_weights_from_config() {
        let cfg = Scoring {
            burst_count_weight: 0.0,
            ..Scoring::default()
        };
        let w = RiskScoreWeights::from_config(&cfg);
        assert_eq!(w.weight(ScoringFeature::BurstCount), 0.0);
        assert!((w.weight(ScoringFeature::RepayCount) + 30.0).abs() < f64::EPSILON);
    }
}
