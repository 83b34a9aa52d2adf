use std::env;
use std::path::Path;

use crate::{OuiError, Result};

pub(crate) fn env_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub(crate) fn env_u64(name: &str, default: u64) -> Result<u64> {
    match env_optional(name) {
        Some(value) => parse_u64(name, &value),
        None => Ok(default),
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value.trim().parse::<u64>().map_err(|_| OuiError::Config {
        reason: format!("invalid {name}: {value:?}").into(),
    })
}

pub(crate) fn checksum_hex(checksum: &[u8; 32]) -> String {
    let mut out = String::with_capacity(64);
    for byte in checksum {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// BLAKE3 digest of a written file, reported so two runs can be compared.
pub(crate) fn file_digest(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|err| OuiError::io(err, path))?;
    Ok(checksum_hex(blake3::hash(&bytes).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_hex() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        bytes[31] = 0x01;
        let hex = checksum_hex(&bytes);
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("01"));
    }

    #[test]
    fn test_file_digest_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.xml");
        let b = dir.path().join("b.xml");
        std::fs::write(&a, "<records/>").unwrap();
        std::fs::write(&b, "<records/>").unwrap();
        assert_eq!(file_digest(&a).unwrap(), file_digest(&b).unwrap());
        assert!(file_digest(&dir.path().join("c.xml")).is_err());
    }

    #[test]
    fn test_env_u64_default() {
        assert_eq!(env_u64("OUIMAP_TEST_UNSET_VARIABLE", 42).unwrap(), 42);
    }

    #[test]
    fn test_parse_u64_reports_config_error() {
        assert_eq!(parse_u64("OUIMAP_DOWNLOAD_TIMEOUT_SECS", " 30 ").unwrap(), 30);
        assert!(matches!(
            parse_u64("OUIMAP_DOWNLOAD_TIMEOUT_SECS", "soon"),
            Err(OuiError::Config { .. })
        ));
    }
}
