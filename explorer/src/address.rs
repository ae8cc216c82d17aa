//! Account address parsing.
//!
//! Addresses are 32 bytes. Users paste them in several shapes: with or without
//! the `0x` prefix, upper or lower case, and in the short form where leading
//! zero bytes are dropped (`0x1`). Everything is normalized to the long,
//! lower-case, `0x`-prefixed form before it reaches an upstream query.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Address length in bytes (64 hex chars)
pub const ADDRESS_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountAddress([u8; ADDRESS_BYTES]);

impl AccountAddress {
    /// Long form: `0x` followed by 64 lower-case hex chars.
    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Parse an address from user or upstream input.
pub fn parse_address(value: &str) -> Result<AccountAddress, String> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if digits.is_empty() {
        return Err("address must not be empty".to_string());
    }

    if digits.len() > ADDRESS_BYTES * 2 {
        return Err(format!(
            "address must be at most {} hex chars, got {}",
            ADDRESS_BYTES * 2,
            digits.len()
        ));
    }

    // Short form: left-pad to full width before decoding.
    let padded = format!("{:0>width$}", digits, width = ADDRESS_BYTES * 2);
    let bytes = hex::decode(&padded).map_err(|_| "address must be valid hex".to_string())?;

    let mut arr = [0u8; ADDRESS_BYTES];
    arr.copy_from_slice(&bytes);
    Ok(AccountAddress(arr))
}

/// True when both strings name the same account.
///
/// Falls back to a case-insensitive comparison when either side is not a
/// parseable address, so odd upstream values never cause an error.
pub fn same_account(a: &str, b: &str) -> bool {
    match (parse_address(a), parse_address(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}

impl FromStr for AccountAddress {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_address(value)
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_literal())
    }
}

impl Serialize for AccountAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex_literal())
    }
}
