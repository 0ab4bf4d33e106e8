use alloy::primitives::Address;
use std::str::FromStr;

use crate::error::ScanError;

const ALIAS_SUFFIX: &str = ".eth";

/// `0x` followed by exactly 40 hex digits. Checksum casing is not enforced.
pub fn is_valid_address(s: &str) -> bool {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(body) => body.len() == 40 && hex::decode(body).is_ok(),
        None => false,
    }
}

/// Name-service alias such as `vitalik.eth` or `pay.vitalik.eth`.
pub fn is_alias_name(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    let Some(stem) = lower.strip_suffix(ALIAS_SUFFIX) else {
        return false;
    };
    if stem.is_empty() {
        return false;
    }
    stem.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    })
}

/// Parse a hex address into alloy's type.
pub fn parse_address(s: &str) -> Result<Address, ScanError> {
    if !is_valid_address(s) {
        return Err(ScanError::InvalidAddress(s.to_string()));
    }
    Address::from_str(s).map_err(|_| ScanError::InvalidAddress(s.to_string()))
}

/// EIP-55 checksummed form used for stored wallet addresses.
pub fn canonical(address: &Address) -> String {
    address.to_checksum(None)
}

/// Case-insensitive address comparison for provider-supplied strings.
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
