use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

/// Allow-list of protocol contracts, compared lower-cased.
#[derive(Debug, Clone)]
pub struct ContractFilter {
    contracts: HashSet<String>,
}

impl ContractFilter {
    pub fn new<S: AsRef<str>>(contracts: &[S]) -> Self {
        Self {
            contracts: contracts
                .iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, to: &str, contract_address: &str) -> bool {
        [to, contract_address]
            .iter()
            .map(|a| a.trim().to_lowercase())
            .any(|a| !a.is_empty() && self.contracts.contains(&a))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterStats {
    pub read: usize,
    pub kept: usize,
}

/// Copy rows touching an allow-listed contract. Every column is carried over;
/// `to` and `contractAddress` are written lower-cased.
pub fn filter_transactions<R: Read, W: Write>(
    filter: &ContractFilter,
    reader: R,
    writer: W,
) -> Result<FilterStats> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let to_idx = headers.iter().position(|h| h == "to");
    let contract_idx = headers.iter().position(|h| h == "contractAddress");

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&headers)?;

    let mut stats = FilterStats::default();
    let mut record = csv::StringRecord::new();
    let mut out = csv::StringRecord::new();
    while rdr.read_record(&mut record)? {
        stats.read += 1;
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");
        if !filter.matches(field(to_idx), field(contract_idx)) {
            continue;
        }
        out.clear();
        for (i, value) in record.iter().enumerate() {
            if Some(i) == to_idx || Some(i) == contract_idx {
                out.push_field(&value.to_lowercase());
            } else {
                out.push_field(value);
            }
        }
        wtr.write_record(&out)?;
        stats.kept += 1;
    }
    wtr.flush()?;
    Ok(stats)
}

pub fn run_filter(contracts: &[String], input: &Path, output: &Path) -> Result<FilterStats> {
    let filter = ContractFilter::new(contracts);
    let src = std::fs::File::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let dst = std::fs::File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let stats = filter_transactions(&filter, src, dst)?;
    metrics::counter!("scorer_transactions_filtered_total").increment(stats.kept as u64);
    tracing::info!(
        read = stats.read,
        kept = stats.kept,
        output = %output.display(),
        "protocol transactions filtered"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPTROLLER: &str = "0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b";

    fn filter() -> ContractFilter {
        ContractFilter::new(&[COMPTROLLER.to_uppercase().replace("0X", "0x")])
    }

    #[test]
    fn test_matches_either_column_case_insensitively() {
        let f = filter();
        assert!(f.matches(&COMPTROLLER.to_uppercase(), ""));
        assert!(f.matches("0xother", COMPTROLLER));
        assert!(!f.matches("0xother", ""));
        assert!(!f.matches("", ""));
    }

    #[test]
    fn test_filter_keeps_all_columns() {
        let input = format!(
            "hash,to,value,contractAddress,wallet_id\n\
             0x1,{COMPTROLLER},0,,0xw\n\
             0x2,0xdead,0,,0xw\n\
             0x3,,0,{COMPTROLLER},0xw\n"
        );
        let mut out = Vec::new();
        let stats = filter_transactions(&filter(), input.as_bytes(), &mut out).unwrap();
        assert_eq!(stats, FilterStats { read: 3, kept: 2 });

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "hash,to,value,contractAddress,wallet_id");
        assert_eq!(lines[1], format!("0x1,{COMPTROLLER},0,,0xw"));
        assert_eq!(lines[2], format!("0x3,,0,{COMPTROLLER},0xw"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_kept_addresses_are_lower_cased() {
        let upper = COMPTROLLER.to_uppercase().replace("0X", "0x");
        let input = format!("hash,to,contractAddress\n0xABC,{upper},0xDEAD\n");
        let mut out = Vec::new();
        filter_transactions(&filter(), input.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some(format!("0xABC,{COMPTROLLER},0xdead").as_str()));
    }

    #[test]
    fn test_missing_contract_address_column_is_empty() {
        let input = format!("hash,to,wallet_id\n0x1,{COMPTROLLER},0xw\n0x2,0xdead,0xw\n");
        let mut out = Vec::new();
        let stats = filter_transactions(&filter(), input.as_bytes(), &mut out).unwrap();
        assert_eq!(stats.kept, 1);
    }

    #[test]
    fn test_run_filter_writes_file_and_counts() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.csv");
        let output = dir.path().join("nested/filtered.csv");
        std::fs::write(
            &input,
            format!("to,contractAddress\n{COMPTROLLER},\n0xdead,\n"),
        )
        .unwrap();

        let stats = metrics::with_local_recorder(&recorder, || {
            run_filter(&[COMPTROLLER.to_string()], &input, &output).unwrap()
        });
        assert_eq!(stats.kept, 1);
        assert!(output.exists());
        assert!(handle
            .render()
            .contains("scorer_transactions_filtered_total 1"));
    }
}
