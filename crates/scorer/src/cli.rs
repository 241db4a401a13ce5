use anyhow::Result;
use common::config::Config;
use common::etherscan::EtherscanClient;
use std::path::Path;
use std::time::Duration;

use crate::{fetch, filter, pipeline};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Score { input: Option<String> },
    Fetch { wallets: Option<String> },
    Filter,
}

pub fn parse_args<I>(mut args: I) -> std::result::Result<Command, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let Some(cmd) = args.next() else {
        return Ok(Command::Score { input: None });
    };

    let command = match cmd.as_str() {
        "score" => Command::Score { input: args.next() },
        "fetch" => Command::Fetch {
            wallets: args.next(),
        },
        "filter" => Command::Filter,
        other => return Err(format!("unknown command: {other} (expected score, fetch or filter)")),
    };
    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument: {extra}"));
    }
    Ok(command)
}

pub async fn run_command(cfg: &Config, cmd: Command) -> Result<()> {
    match cmd {
        Command::Score { input } => {
            let input = input.unwrap_or_else(|| cfg.pipeline.transactions_path.clone());
            pipeline::run_score(cfg, Path::new(&input), Path::new(&cfg.pipeline.scores_path))?;
            Ok(())
        }
        Command::Fetch { wallets } => {
            let wallets_path = wallets.unwrap_or_else(|| cfg.pipeline.wallets_path.clone());
            let wallets = fetch::read_wallet_list(Path::new(&wallets_path))?;
            tracing::info!(wallets = wallets.len(), source = %wallets_path, "wallet list loaded");

            let client = EtherscanClient::from_config(&cfg.etherscan)?;
            fetch::run_fetch(
                &client,
                &wallets,
                Path::new(&cfg.pipeline.raw_transactions_path),
                cfg.etherscan.page_size,
                Duration::from_millis(cfg.etherscan.rate_limit_delay_ms),
            )
            .await?;
            Ok(())
        }
        Command::Filter => {
            filter::run_filter(
                &cfg.filter.contracts,
                Path::new(&cfg.pipeline.raw_transactions_path),
                Path::new(&cfg.pipeline.filtered_transactions_path),
            )?;
            Ok(())
        }
    }
}
