//! Unit tests for the config module
//!
//! Run with: cargo test --test config_tests

use account_explorer::config::{Config, Network};
use std::time::Duration;

fn create_test_config() -> Config {
    Config {
        network: "testnet".to_string(),
        indexer_url: None,
        node_url: None,
        api_key: None,
        server_host: "127.0.0.1".to_string(),
        server_port: 9090,
        page_size: 100,
        rest_page_size: 1000,
        rest_high_volume_threshold: 1000,
        holdings_limit: 50,
        upstream_timeout_secs: 60,
        max_open_feeds: 16,
    }
}

#[test]
fn test_socket_addr() {
    let config = create_test_config();
    let addr = config.socket_addr().unwrap();
    assert_eq!(addr.ip().to_string(), "127.0.0.1");
    assert_eq!(addr.port(), 9090);
}

#[test]
fn test_socket_addr_invalid_host() {
    let mut config = create_test_config();
    config.server_host = "not a host".to_string();
    assert!(config.socket_addr().is_err());
}

#[test]
fn test_upstream_timeout() {
    let config = create_test_config();
    assert_eq!(config.upstream_timeout(), Duration::from_secs(60));
}

#[test]
fn test_network_parsing() {
    assert_eq!("mainnet".parse::<Network>().unwrap(), Network::Mainnet);
    assert_eq!("Testnet".parse::<Network>().unwrap(), Network::Testnet);
    assert_eq!(" devnet ".parse::<Network>().unwrap(), Network::Devnet);
    assert_eq!("localnet".parse::<Network>().unwrap(), Network::Local);
}

#[test]
fn test_network_parsing_unknown() {
    let err = "moonnet".parse::<Network>().unwrap_err();
    assert!(err.contains("moonnet"));
}

#[test]
fn test_network_display_round_trips() {
    for network in [
        Network::Mainnet,
        Network::Testnet,
        Network::Devnet,
        Network::Local,
    ] {
        assert_eq!(network.to_string().parse::<Network>().unwrap(), network);
    }
}

#[test]
fn test_endpoints_default_to_network() {
    let config = create_test_config();
    assert_eq!(
        config.indexer_endpoint().unwrap(),
        "https://api.testnet.aptoslabs.com/v1/graphql"
    );
    assert_eq!(
        config.node_endpoint().unwrap(),
        "https://api.testnet.aptoslabs.com/v1"
    );
}

#[test]
fn test_endpoint_overrides_win() {
    let mut config = create_test_config();
    config.indexer_url = Some("http://localhost:8090/v1/graphql".to_string());
    config.node_url = Some(" http://localhost:8080/v1 ".to_string());

    assert_eq!(
        config.indexer_endpoint().unwrap(),
        "http://localhost:8090/v1/graphql"
    );
    assert_eq!(config.node_endpoint().unwrap(), "http://localhost:8080/v1");
}

#[test]
fn test_blank_override_falls_back_to_network() {
    let mut config = create_test_config();
    config.node_url = Some("   ".to_string());
    assert_eq!(
        config.node_endpoint().unwrap(),
        "https://api.testnet.aptoslabs.com/v1"
    );
}

#[test]
fn test_endpoint_with_bad_network() {
    let mut config = create_test_config();
    config.network = "nope".to_string();
    assert!(config.indexer_endpoint().is_err());
    assert!(config.node_endpoint().is_err());
}

#[test]
fn test_feed_settings() {
    let config = create_test_config();
    let settings = config.feed_settings().unwrap();
    assert_eq!(settings.page_size, 100);
    assert_eq!(settings.rest_page_size, 1000);
    assert_eq!(settings.rest_high_volume_threshold, 1000);
}

#[test]
fn test_feed_settings_zero_page_size() {
    let mut config = create_test_config();
    config.page_size = 0;
    let err = config.feed_settings().unwrap_err();
    assert!(err.contains("PAGE_SIZE"));
}

#[test]
fn test_feed_settings_threshold_above_rest_page() {
    let mut config = create_test_config();
    config.rest_high_volume_threshold = 2000;
    let err = config.feed_settings().unwrap_err();
    assert!(err.contains("REST_HIGH_VOLUME_THRESHOLD"));
}
