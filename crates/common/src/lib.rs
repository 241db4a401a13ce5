pub mod config;
pub mod etherscan;
pub mod observability;
pub mod types;
