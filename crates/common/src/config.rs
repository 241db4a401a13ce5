use anyhow::{Context, Result};
use serde::Deserialize;
use std::str::FromStr;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: General,
    pub pipeline: Pipeline,
    #[serde(default)]
    pub rules: RiskRules,
    #[serde(default)]
    pub scoring: Scoring,
    #[serde(default)]
    pub filter: Filter,
    pub etherscan: Etherscan,
    #[serde(default)]
    pub observability: Observability,
}

#[derive(Debug, Clone, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    /// Wallet list consumed by `fetch` (needs a `wallet_id` column).
    pub wallets_path: String,
    /// Raw per-wallet transactions written by `fetch`.
    pub raw_transactions_path: String,
    /// Output of `filter`.
    pub filtered_transactions_path: String,
    /// Default input of `score`.
    pub transactions_path: String,
    pub scores_path: String,
    /// Fixed evaluation instant (RFC 3339). Unset means "now".
    pub as_of: Option<String>,
    /// Classify `name(args)` signatures by their bare name. Off means exact match.
    #[serde(default)]
    pub strip_signatures: bool,
}

/// Thresholds for the ordered risk rule chain.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RiskRules {
    pub min_repay_ratio: f64,
    pub max_failed_txs: u32,
    pub max_burst_count: u32,
    pub min_transactions: u32,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            min_repay_ratio: 0.4,
            max_failed_txs: 5,
            max_burst_count: 20,
            min_transactions: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Scoring {
    pub borrow_count_weight: f64,
    pub liquidation_count_weight: f64,
    pub failed_tx_count_weight: f64,
    pub burst_count_weight: f64,
    pub total_transactions_weight: f64,
    pub repay_count_weight: f64,
    /// Fixed normalization constants. When absent, scores are batch-relative.
    pub calibration: Option<Calibration>,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            borrow_count_weight: 40.0,
            liquidation_count_weight: 50.0,
            failed_tx_count_weight: 30.0,
            burst_count_weight: 20.0,
            total_transactions_weight: -20.0,
            repay_count_weight: -30.0,
            calibration: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Calibration {
    pub borrow_count_max: f64,
    pub liquidation_count_max: f64,
    pub failed_tx_count_max: f64,
    pub burst_count_max: f64,
    pub total_transactions_max: f64,
    pub repay_count_max: f64,
    pub raw_score_min: f64,
    pub raw_score_max: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Filter {
    pub contracts: Vec<String>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            contracts: [
                // Compound V2 comptroller
                "0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b",
                // Compound V2 cToken markets: cDAI, cUSDC, cUSDT, cBAT, cREP, cETH, cWBTC, cZRX, cUNI, cCOMP, cMKR
                "0x5d3a536e4d6dbd6114cc1ead35777bab948e3643",
                "0x39aa39c021dfbae8fac545936693ac917d5e7563",
                "0xf650c3d88cc8619c7c8e2ed2c82aac8afd33c4fc",
                "0x6c8c6b02e7b2be14d4fa6022dfd6da6eccab7b5b",
                "0x158079ee67fce2f58472a96584a73c7ab9ac95c1",
                "0x4ddc2d193948926d02f9b1fe9e1daa0718270ed5",
                "0xb3319f5d18bc0d84dd1b4825dcde5d5f7266d407",
                "0x4b0181102a0112a2ef11abf8b0f5c5b4b2518e17",
                "0x35a18000230da775cac24873d00ff85bccded550",
                "0x95b4ef2869e02fb6f7942e93618f8e1f81e96c36",
                "0x3fffb3458b94c82cb8a3e080064d946751b3c1c8",
                // V3 lending pool
                "0x794a61358d6845594f94dc1db02a252b5b4814ad",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Etherscan {
    pub api_url: String,
    pub chain_id: u64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub page_size: u32,
    pub request_timeout_secs: u64,
    pub rate_limit_delay_ms: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Observability {
    pub prometheus_port: Option<u16>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {path}"))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.etherscan.page_size == 0 {
            anyhow::bail!("etherscan.page_size must be > 0");
        }
        if !(0.0..=1.0).contains(&self.rules.min_repay_ratio) {
            anyhow::bail!("rules.min_repay_ratio must be within [0, 1]");
        }
        if let Some(c) = &self.scoring.calibration {
            if c.raw_score_max < c.raw_score_min {
                anyhow::bail!("scoring.calibration.raw_score_max must be >= raw_score_min");
            }
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[general]
log_level = "info"

[pipeline]
wallets_path = "data/wallets.csv"
raw_transactions_path = "data/raw.csv"
filtered_transactions_path = "data/filtered.csv"
transactions_path = "data/raw.csv"
scores_path = "data/scores.csv"

[etherscan]
api_url = "https://api.etherscan.io/v2/api"
chain_id = 1
api_key_env = "ETHERSCAN_API_KEY"
page_size = 1000
request_timeout_secs = 15
rate_limit_delay_ms = 220
max_retries = 3
backoff_base_ms = 500
"#;

    #[test]
    fn test_load_default_config() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.etherscan.chain_id, 1);
        assert!(config.scoring.calibration.is_none());
        assert_eq!(config.filter.contracts.len(), 13);
        assert!(!config.pipeline.strip_signatures);
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.rules.max_failed_txs, 5);
        assert_eq!(config.rules.max_burst_count, 20);
        assert!((config.scoring.liquidation_count_weight - 50.0).abs() < f64::EPSILON);
        assert!((config.scoring.repay_count_weight + 30.0).abs() < f64::EPSILON);
        assert!(config.observability.prometheus_port.is_none());
        assert!(config.pipeline.as_of.is_none());
        assert!(!config.pipeline.strip_signatures);
        assert!(!config.filter.contracts.is_empty());
    }

    #[test]
    fn test_partial_rules_override() {
        let toml = format!("{MINIMAL}\n[rules]\nmax_failed_txs = 9\n");
        let config: Config = toml.parse().unwrap();
        assert_eq!(config.rules.max_failed_txs, 9);
        assert_eq!(config.rules.min_transactions, 5);
    }

    #[test]
    fn test_calibration_section_parses() {
        let toml = format!(
            "{MINIMAL}
[scoring.calibration]
borrow_count_max = 50.0
liquidation_count_max = 5.0
failed_tx_count_max = 40.0
burst_count_max = 200.0
total_transactions_max = 2000.0
repay_count_max = 50.0
raw_score_min = -50.0
raw_score_max = 140.0
"
        );
        let config = Config::from_toml_str(&toml).unwrap();
        let c = config.scoring.calibration.expect("calibration present");
        assert!((c.raw_score_max - 140.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let toml = MINIMAL.replace("page_size = 1000", "page_size = 0");
        assert!(Config::from_toml_str(&toml).is_err());
    }
}
