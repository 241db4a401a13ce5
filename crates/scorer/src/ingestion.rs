use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

/// Date-time layouts we recognise but refuse, because they carry no zone.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read transactions CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: empty wallet_id")]
    MissingWallet { line: u64 },
    #[error("line {line}: value {value:?} is not a non-negative number")]
    MalformedValue { line: u64, value: String },
    #[error("line {line}: timeStamp {value:?} is neither epoch seconds nor RFC 3339")]
    MalformedTimestamp { line: u64, value: String },
    #[error("line {line}: timeStamp {value:?} has no time zone")]
    MissingTimeZone { line: u64, value: String },
    #[error("line {line}: isError {value:?} is not an integer flag")]
    MalformedErrorFlag { line: u64, value: String },
}

/// Columns the scorer reads; everything else in the file is ignored.
#[derive(Debug, Deserialize)]
struct TransactionRecord {
    wallet_id: String,
    #[serde(rename = "functionName", default)]
    function_name: Option<String>,
    value: String,
    #[serde(rename = "timeStamp")]
    time_stamp: String,
    #[serde(rename = "isError")]
    is_error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub wallet_id: String,
    pub function_name: Option<String>,
    pub value_wei: Decimal,
    pub timestamp: DateTime<Utc>,
    pub is_error: bool,
}

impl Transaction {
    pub fn value_eth(&self) -> f64 {
        (self.value_wei / Decimal::from(WEI_PER_ETH))
            .to_f64()
            .unwrap_or(0.0)
    }

    fn from_record(rec: TransactionRecord, line: u64) -> Result<Self, IngestError> {
        let wallet_id = rec.wallet_id.trim().to_string();
        if wallet_id.is_empty() {
            return Err(IngestError::MissingWallet { line });
        }
        let value_wei = parse_wei(&rec.value).ok_or_else(|| IngestError::MalformedValue {
            line,
            value: rec.value.clone(),
        })?;
        let timestamp = parse_timestamp(&rec.time_stamp, line)?;
        let is_error = rec
            .is_error
            .trim()
            .parse::<i64>()
            .map_err(|_| IngestError::MalformedErrorFlag {
                line,
                value: rec.is_error.clone(),
            })?
            == 1;

        Ok(Self {
            wallet_id,
            function_name: rec.function_name,
            value_wei,
            timestamp,
            is_error,
        })
    }
}

fn parse_wei(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    let value = Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()?;
    (!value.is_sign_negative()).then_some(value)
}

/// Every timestamp leaves ingestion as a UTC instant:
/// - integer strings are Unix epoch seconds
/// - RFC 3339 strings must carry their offset and are converted to UTC
/// - zone-less date-times are rejected
pub fn parse_timestamp(raw: &str, line: u64) -> Result<DateTime<Utc>, IngestError> {
    let s = raw.trim();
    if let Ok(secs) = s.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0).ok_or_else(|| IngestError::MalformedTimestamp {
            line,
            value: raw.to_string(),
        });
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if NAIVE_LAYOUTS
        .iter()
        .any(|layout| NaiveDateTime::parse_from_str(s, layout).is_ok())
    {
        return Err(IngestError::MissingTimeZone {
            line,
            value: raw.to_string(),
        });
    }
    Err(IngestError::MalformedTimestamp {
        line,
        value: raw.to_string(),
    })
}

pub fn read_transactions(path: &Path) -> Result<Vec<Transaction>, IngestError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    read_transactions_from(file)
}

/// Parse a whole table; the first bad row aborts ingestion.
pub fn read_transactions_from<R: Read>(reader: R) -> Result<Vec<Transaction>, IngestError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut out = Vec::new();

    while rdr.read_record(&mut record)? {
        let line = record.position().map_or(0, csv::Position::line);
        let rec: TransactionRecord = record.deserialize(Some(&headers))?;
        out.push(Transaction::from_record(rec, line)?);
    }
    Ok(out)
}
