use httpmock::Method::GET;
use httpmock::MockServer;
use price_feed::{CoinstatsSource, CryptoCompareSource, PriceCache, PriceSource};
use rust_decimal_macros::dec;
use serde_json::json;

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn coinstats_returns_every_listed_coin() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/public/v1/coins")
                .query_param("skip", "0")
                .query_param("limit", "5")
                .query_param("currency", "USD");
            then.status(200).json_body(json!({
                "coins": [
                    {"id": "bitcoin", "symbol": "BTC", "price": 30123.5},
                    {"id": "ethereum", "symbol": "ETH", "price": 1850.25}
                ]
            }));
        })
        .await;

    let source = CoinstatsSource::new(&server.base_url(), 5, "USD", 5).unwrap();
    let prices = source.fetch(&symbols(&["ETH"])).await.unwrap();

    mock.assert_async().await;
    assert_eq!(prices.len(), 2);
    assert_eq!(prices["ETH"], dec!(1850.25));
    assert_eq!(prices["BTC"], dec!(30123.5));
}

#[tokio::test]
async fn cryptocompare_asks_for_the_requested_symbols() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/data/pricemulti")
                .query_param("fsyms", "ETH,BTC")
                .query_param("tsyms", "USD");
            then.status(200).json_body(json!({
                "ETH": {"USD": 1850.5},
                "BTC": {"USD": 30000}
            }));
        })
        .await;

    let source = CryptoCompareSource::new(&server.base_url(), "USD", 5).unwrap();
    let prices = source.fetch(&symbols(&["ETH", "BTC"])).await.unwrap();

    mock.assert_async().await;
    assert_eq!(prices["ETH"], dec!(1850.5));
    assert_eq!(prices["BTC"], dec!(30000));
}

#[tokio::test]
async fn server_error_leaves_cache_untouched() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/public/v1/coins");
            then.status(503).body("maintenance");
        })
        .await;

    let source = CoinstatsSource::new(&server.base_url(), 100, "USD", 5).unwrap();
    let mut cache = PriceCache::with_prices([("ETH".to_string(), dec!(1800))].into());

    assert!(source.fetch(&symbols(&["ETH"])).await.is_err());
    assert_eq!(cache.refresh(&source, &symbols(&["ETH"])).await, 0);
    assert_eq!(cache.get("ETH"), Some(dec!(1800)));
}
