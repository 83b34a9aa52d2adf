use rayon::prelude::*;
use serde::Serialize;

use crate::{normalize_mac, prefix_bits, PrefixIndex};

pub(crate) const UNKNOWN_ADDRESS: &str = "Unknown address";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum Resolution {
    Match {
        mac: String,
        prefix: String,
        prefix_bits: usize,
        organization: String,
        address: String,
    },
    NoMatch {
        mac: String,
    },
}

impl Resolution {
    pub(crate) fn is_match(&self) -> bool {
        matches!(self, Resolution::Match { .. })
    }
}

/// Longest-prefix match of a MAC address against the index.
///
/// Probes every candidate length from the longest indexed key down to the
/// shortest, which gives the same answer as scanning every key. Two distinct
/// keys of equal length cannot both prefix the same address, so there are no
/// ties to break.
pub(crate) fn resolve(index: &PrefixIndex, input: &str) -> Resolution {
    let mac = normalize_mac(input);
    let Some((min_len, max_len)) = index.key_len_range() else {
        return Resolution::NoMatch { mac };
    };

    let longest = max_len.min(mac.len());
    for len in (min_len..=longest).rev() {
        let candidate = &mac[..len];
        if let Some(record) = index.lookup_exact(candidate) {
            return Resolution::Match {
                prefix: record.prefix.clone(),
                prefix_bits: prefix_bits(&record.prefix),
                organization: record.name.clone(),
                address: record
                    .address
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
                mac,
            };
        }
    }
    Resolution::NoMatch { mac }
}

/// Resolve many inputs against the shared, read-only index. Output order
/// follows input order.
pub(crate) fn resolve_all(index: &PrefixIndex, inputs: &[String]) -> Vec<Resolution> {
    inputs.par_iter().map(|input| resolve(index, input)).collect()
}
