//! Account address validation (format + EIP-55 checksum)

use alloy::primitives::{keccak256, Address};

use super::ValidationError;

/// Parse a user-supplied account address.
///
/// Accepts `0x` followed by 40 hex digits. All-lowercase and all-uppercase
/// payloads are accepted as-is; mixed-case payloads must carry a valid
/// EIP-55 checksum.
pub fn parse_account(field: &'static str, input: &str) -> Result<Address, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }

    let payload = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| invalid(field, trimmed))?;

    if payload.len() != 40 || !payload.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid(field, trimmed));
    }

    let has_lower = payload.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = payload.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(payload) != format!("0x{payload}") {
        return Err(ValidationError::BadChecksum {
            field,
            value: trimmed.to_string(),
        });
    }

    payload
        .parse::<Address>()
        .map_err(|_| invalid(field, trimmed))
}

/// Whether `input` would be accepted by [`parse_account`].
pub fn is_valid_account(input: &str) -> bool {
    parse_account("address", input).is_ok()
}

/// `0x1234...abcd` form used in status messages.
pub fn short_account(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

fn to_checksum_address(payload: &str) -> String {
    let lower = payload.to_ascii_lowercase();
    let hash = keccak256(lower.as_bytes());

    let mut result = String::with_capacity(42);
    result.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            result.push(c.to_ascii_uppercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn invalid(field: &'static str, value: &str) -> ValidationError {
    ValidationError::InvalidAddress {
        field,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        let addr = "fb6916095ca1df60bb79ce92ce3ea74c37c5d359";
        assert_eq!(
            to_checksum_address(addr),
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
    }

    #[test]
    fn test_accepts_lowercase_and_checksummed() {
        assert!(is_valid_account("0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359"));
        assert!(is_valid_account("0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"));
        assert!(is_valid_account("  0xFB6916095CA1DF60BB79CE92CE3EA74C37C5D359 "));
    }

    #[test]
    fn test_rejects_bad_checksum() {
        let err = parse_account("producer", "0xFb6916095ca1df60bB79Ce92cE3Ea74c37c5d359").unwrap_err();
        assert!(matches!(err, ValidationError::BadChecksum { field: "producer", .. }));
    }

    #[test]
    fn test_rejects_malformed() {
        for input in ["", "0x", "0x1234", "fb6916095ca1df60bb79ce92ce3ea74c37c5d359", "0xzz6916095ca1df60bb79ce92ce3ea74c37c5d359"] {
            assert!(!is_valid_account(input), "{input} should be rejected");
        }
        assert!(matches!(
            parse_account("retailer", "   "),
            Err(ValidationError::EmptyField("retailer"))
        ));
    }

    #[test]
    fn test_short_account() {
        let addr = parse_account("a", "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359").unwrap();
        assert_eq!(short_account(&addr), "0xfB69...d359");
    }
}
