use common::etherscan::EtherscanClient;

#[tokio::test]
#[ignore] // requires network and ETHERSCAN_API_KEY
async fn test_fetch_real_txlist_first_page() {
    let api_key = std::env::var("ETHERSCAN_API_KEY").unwrap();
    let client = EtherscanClient::new("https://api.etherscan.io/v2/api", 1, &api_key);
    // cETH market contract: long history, first page is always full.
    let txs = client
        .fetch_txlist("0x4ddc2d193948926d02f9b1fe9e1daa0718270ed5", 1, 5)
        .await
        .unwrap();
    assert_eq!(txs.len(), 5);
    assert!(txs.iter().all(|t| t.time_stamp.is_some()));
}
