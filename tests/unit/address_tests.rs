//! Unit tests for the address module
//!
//! Run with: cargo test --test address_tests

use account_explorer::address::{parse_address, same_account, AccountAddress, ADDRESS_BYTES};

const LONG_ONE: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";

#[test]
fn test_parse_short_form_pads() {
    let address = parse_address("0x1").unwrap();
    assert_eq!(address.to_hex_literal(), LONG_ONE);
}

#[test]
fn test_parse_without_prefix() {
    let address = parse_address("1").unwrap();
    assert_eq!(address.to_string(), LONG_ONE);
}

#[test]
fn test_parse_uppercase_and_whitespace() {
    let address = parse_address("  0XABCDEF  ").unwrap();
    assert!(address.to_hex_literal().ends_with("abcdef"));
    assert_eq!(address.to_hex_literal().len(), 2 + ADDRESS_BYTES * 2);
}

#[test]
fn test_parse_full_length() {
    let full = format!("0x{}", "ab".repeat(ADDRESS_BYTES));
    let address = parse_address(&full.to_uppercase().replace("0X", "0x")).unwrap();
    assert_eq!(address.to_hex_literal(), full);
}

#[test]
fn test_parse_empty() {
    assert!(parse_address("").unwrap_err().contains("empty"));
    assert!(parse_address("0x").unwrap_err().contains("empty"));
}

#[test]
fn test_parse_too_long() {
    let too_long = format!("0x{}", "a".repeat(ADDRESS_BYTES * 2 + 1));
    let err = parse_address(&too_long).unwrap_err();
    assert!(err.contains("at most 64"));
}

#[test]
fn test_parse_not_hex() {
    let err = parse_address("0xnothex").unwrap_err();
    assert!(err.contains("valid hex"));
}

#[test]
fn test_from_str() {
    let address: AccountAddress = "0x1".parse().unwrap();
    assert_eq!(address, parse_address(LONG_ONE).unwrap());
    assert!("0xnothex".parse::<AccountAddress>().is_err());
}

#[test]
fn test_serializes_as_long_form() {
    let address = parse_address("0x1").unwrap();
    let json = serde_json::to_string(&address).unwrap();
    assert_eq!(json, format!("\"{}\"", LONG_ONE));
}

#[test]
fn test_same_account_across_forms() {
    assert!(same_account("0x1", LONG_ONE));
    assert!(same_account("0xCAFE", "0xcafe"));
    assert!(!same_account("0x1", "0x2"));
}

#[test]
fn test_same_account_falls_back_for_unparseable() {
    assert!(same_account("alice.apt", "ALICE.apt"));
    assert!(!same_account("alice.apt", "0x1"));
}
