//! Address validation and the zero-address sentinel.
//!
//! Contract calls encode "no beneficiary" and "no executor" as the all-zero
//! address. Inside the crate absence is an `Option<Address>`; the sentinel only
//! appears when a value is written into a call tuple.

use crate::error::{Result, TezoroError};
use alloy_primitives::Address;
use std::str::FromStr;

/// The reserved all-zero address
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// Syntactic address check: `0x` followed by 40 hex digits. Mixed-case input
/// must carry a valid EIP-55 checksum.
pub fn is_address(value: &str) -> bool {
    let Some(hex) = value.strip_prefix("0x") else {
        return false;
    };
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = hex.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = hex.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(value, None).is_ok();
    }

    true
}

/// Parse an address, failing with [`TezoroError::InvalidAddress`]
pub fn parse_address(value: &str) -> Result<Address> {
    if !is_address(value) {
        return Err(TezoroError::InvalidAddress(value.to_string()));
    }
    Address::from_str(value).map_err(|_| TezoroError::InvalidAddress(value.to_string()))
}

/// `None` for the zero address
pub fn non_zero(address: Address) -> Option<Address> {
    (address != ZERO_ADDRESS).then_some(address)
}

/// Wire form of an optional address
pub fn or_sentinel(address: Option<Address>) -> Address {
    address.unwrap_or(ZERO_ADDRESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    #[test_case("0xd9bE6af8Cc9553Ffa6402939bEFAa63108366A06", true ; "checksummed")]
    #[test_case("0xd9be6af8cc9553ffa6402939befaa63108366a06", true ; "lowercase")]
    #[test_case("0xD9BE6AF8CC9553FFA6402939BEFAA63108366A06", true ; "uppercase")]
    #[test_case("0x0000000000000000000000000000000000000000", true ; "zero")]
    #[test_case("0xd9bE6af8Cc9553Ffa6402939bEFAa63108366a06", false ; "bad checksum")]
    #[test_case("d9be6af8cc9553ffa6402939befaa63108366a06", false ; "missing prefix")]
    #[test_case("0xd9be6af8cc9553ffa6402939befaa63108366a0", false ; "too short")]
    #[test_case("0xz9be6af8cc9553ffa6402939befaa63108366a06", false ; "non hex")]
    #[test_case("", false ; "empty")]
    fn test_is_address(input: &str, expected: bool) {
        assert_eq!(is_address(input), expected);
    }

    #[test]
    fn test_parse_address() {
        let address = parse_address("0xd9be6af8cc9553ffa6402939befaa63108366a06").unwrap();
        assert_eq!(
            address.to_checksum(None),
            "0xd9bE6af8Cc9553Ffa6402939bEFAa63108366A06"
        );

        assert_matches!(
            parse_address("0x1234"),
            Err(TezoroError::InvalidAddress(value)) if value == "0x1234"
        );
    }

    #[test]
    fn test_sentinel_round_trip() {
        assert_eq!(non_zero(ZERO_ADDRESS), None);
        assert_eq!(or_sentinel(None), ZERO_ADDRESS);

        let address = Address::repeat_byte(0x11);
        assert_eq!(non_zero(address), Some(address));
        assert_eq!(or_sentinel(Some(address)), address);
    }
}
