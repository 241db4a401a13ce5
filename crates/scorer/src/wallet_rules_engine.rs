use crate::wallet_features::WalletFeatureVector;
use common::config::RiskRules;

/// Floor for the borrowed amount in the repay ratio.
pub const REPAY_RATIO_EPSILON: f64 = 1e-8;

/// Which rule ended the chain for a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskReason {
    Liquidated,
    LowRepayRatio,
    FailedTransactions,
    BurstActivity,
    LowActivity,
    Clean,
}

impl RiskReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Liquidated => "liquidated",
            Self::LowRepayRatio => "low_repay_ratio",
            Self::FailedTransactions => "failed_transactions",
            Self::BurstActivity => "burst_activity",
            Self::LowActivity => "low_activity",
            Self::Clean => "clean",
        }
    }

    pub fn is_risky(self) -> bool {
        matches!(
            self,
            Self::Liquidated | Self::LowRepayRatio | Self::FailedTransactions | Self::BurstActivity
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskDecision {
    pub risky: bool,
    pub reason: RiskReason,
}

impl From<RiskReason> for RiskDecision {
    fn from(reason: RiskReason) -> Self {
        Self {
            risky: reason.is_risky(),
            reason,
        }
    }
}

pub fn repay_ratio(features: &WalletFeatureVector) -> f64 {
    features.total_repay_eth / features.total_borrow_eth.max(REPAY_RATIO_EPSILON)
}

/// Ordered rule chain; the first rule that fires decides.
/// A borrower whose repay ratio is acceptable still goes through the later rules.
pub fn evaluate_risk(features: &WalletFeatureVector, rules: &RiskRules) -> RiskDecision {
    if features.liquidation_count > 0 {
        return RiskReason::Liquidated.into();
    }
    if features.borrow_count > 0 && repay_ratio(features) < rules.min_repay_ratio {
        return RiskReason::LowRepayRatio.into();
    }
    if features.failed_tx_count > rules.max_failed_txs {
        return RiskReason::FailedTransactions.into();
    }
    if features.burst_count > rules.max_burst_count {
        return RiskReason::BurstActivity.into();
    }
    if features.total_transactions < rules.min_transactions {
        return RiskReason::LowActivity.into();
    }
    RiskReason::Clean.into()
}
