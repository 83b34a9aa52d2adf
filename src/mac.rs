use crate::{OuiError, Result};

/// Canonical length of a full 48-bit address in hex characters.
pub(crate) const MAC_HEX_LEN: usize = 12;

/// Strip every non-hex character and uppercase the rest.
///
/// Accepts bare (`aabbccddeeff`), colon, dash, dot (`aabb.ccdd.eeff`) and
/// switch-style (`aabbcc-ddeeff`) notations alike. Shorter results are kept
/// as-is so partial addresses can still match a registry prefix.
pub(crate) fn normalize_mac(input: &str) -> String {
    input
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Registry prefixes use the same alphabet as addresses.
pub(crate) fn normalize_prefix(input: &str) -> String {
    normalize_mac(input)
}

/// Normalize user input, rejecting strings without a single hex digit.
pub(crate) fn parse_mac(input: &str) -> Result<String> {
    let normalized = normalize_mac(input);
    if normalized.is_empty() {
        return Err(OuiError::InvalidMac {
            input: input.to_string(),
        });
    }
    Ok(normalized)
}

pub(crate) fn is_full_mac(normalized: &str) -> bool {
    normalized.len() == MAC_HEX_LEN
}

/// `AABBCCDDEEFF` -> `AA:BB:CC:DD:EE:FF`; partial input keeps its odd tail.
pub(crate) fn format_colon(normalized: &str) -> String {
    normalized
        .as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).into_owned())
        .collect::<Vec<_>>()
        .join(":")
}

/// Bits covered by a hex prefix (`001122` -> 24, `0011223` -> 28).
pub(crate) fn prefix_bits(prefix: &str) -> usize {
    prefix.len() * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_delimiter_styles() {
        let expected = "AABBCCDDEEFF";
        for input in [
            "AABBCCDDEEFF",
            "aa:bb:cc:dd:ee:ff",
            "AA-BB-CC-DD-EE-FF",
            "AABBCC-DDEEFF",
            "aabb.ccdd.eeff",
            "  aa bb cc dd ee ff ",
        ] {
            assert_eq!(normalize_mac(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn test_normalize_keeps_partial() {
        assert_eq!(normalize_mac("00-11-22"), "001122");
        assert_eq!(normalize_mac("zz"), "");
        assert!(!is_full_mac("001122"));
        assert!(is_full_mac("001122334455"));
    }

    #[test]
    fn test_parse_mac_rejects_non_hex() {
        assert_eq!(parse_mac("00:11:22:33:44:55").unwrap(), "001122334455");
        assert!(matches!(parse_mac("--"), Err(OuiError::InvalidMac { .. })));
    }

    #[test]
    fn test_format_colon() {
        assert_eq!(format_colon("AABBCCDDEEFF"), "AA:BB:CC:DD:EE:FF");
        assert_eq!(format_colon("0011223"), "00:11:22:3");
        assert_eq!(format_colon(""), "");
    }

    #[test]
    fn test_prefix_bits() {
        assert_eq!(prefix_bits("001122"), 24);
        assert_eq!(prefix_bits("0011223"), 28);
        assert_eq!(prefix_bits("001122334"), 36);
    }
}
