use serde::{Deserialize, Serialize};

/// Envelope of every Etherscan `module=account` response.
///
/// `result` is a list on success and a plain string on most errors
/// (e.g. "Invalid API Key"), so it stays untyped until `status` is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct EtherscanResponse {
    pub status: String,
    pub message: String,
    pub result: serde_json::Value,
}

/// Transaction from Etherscan `action=txlist`.
///
/// Field order matches the API payload; it is also the column order of the
/// raw transactions CSV (followed by `wallet_id`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTransaction {
    pub block_number: Option<String>,
    pub time_stamp: Option<String>,
    pub hash: Option<String>,
    pub nonce: Option<String>,
    pub block_hash: Option<String>,
    pub transaction_index: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    pub gas: Option<String>,
    pub gas_price: Option<String>,
    pub is_error: Option<String>,
    #[serde(rename = "txreceipt_status")]
    pub txreceipt_status: Option<String>,
    pub input: Option<String>,
    pub contract_address: Option<String>,
    pub cumulative_gas_used: Option<String>,
    pub gas_used: Option<String>,
    pub confirmations: Option<String>,
    pub method_id: Option<String>,
    pub function_name: Option<String>,
}

/// A fetched transaction tagged with the wallet it was fetched for.
#[derive(Debug, Clone, Serialize)]
pub struct WalletTransactionRow<'a> {
    #[serde(rename = "blockNumber")]
    pub block_number: Option<&'a str>,
    #[serde(rename = "timeStamp")]
    pub time_stamp: Option<&'a str>,
    pub hash: Option<&'a str>,
    pub nonce: Option<&'a str>,
    #[serde(rename = "blockHash")]
    pub block_hash: Option<&'a str>,
    #[serde(rename = "transactionIndex")]
    pub transaction_index: Option<&'a str>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub value: Option<&'a str>,
    pub gas: Option<&'a str>,
    #[serde(rename = "gasPrice")]
    pub gas_price: Option<&'a str>,
    #[serde(rename = "isError")]
    pub is_error: Option<&'a str>,
    pub txreceipt_status: Option<&'a str>,
    pub input: Option<&'a str>,
    #[serde(rename = "contractAddress")]
    pub contract_address: Option<&'a str>,
    #[serde(rename = "cumulativeGasUsed")]
    pub cumulative_gas_used: Option<&'a str>,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<&'a str>,
    pub confirmations: Option<&'a str>,
    #[serde(rename = "methodId")]
    pub method_id: Option<&'a str>,
    #[serde(rename = "functionName")]
    pub function_name: Option<&'a str>,
    pub wallet_id: &'a str,
}

impl<'a> WalletTransactionRow<'a> {
    pub fn new(tx: &'a ApiTransaction, wallet_id: &'a str) -> Self {
        Self {
            block_number: tx.block_number.as_deref(),
            time_stamp: tx.time_stamp.as_deref(),
            hash: tx.hash.as_deref(),
            nonce: tx.nonce.as_deref(),
            block_hash: tx.block_hash.as_deref(),
            transaction_index: tx.transaction_index.as_deref(),
            from: tx.from.as_deref(),
            to: tx.to.as_deref(),
            value: tx.value.as_deref(),
            gas: tx.gas.as_deref(),
            gas_price: tx.gas_price.as_deref(),
            is_error: tx.is_error.as_deref(),
            txreceipt_status: tx.txreceipt_status.as_deref(),
            input: tx.input.as_deref(),
            contract_address: tx.contract_address.as_deref(),
            cumulative_gas_used: tx.cumulative_gas_used.as_deref(),
            gas_used: tx.gas_used.as_deref(),
            confirmations: tx.confirmations.as_deref(),
            method_id: tx.method_id.as_deref(),
            function_name: tx.function_name.as_deref(),
            wallet_id,
        }
    }
}
