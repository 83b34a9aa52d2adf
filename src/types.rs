use std::collections::BTreeMap;

use serde::Serialize;

use crate::{EnhanceReport, RegistryStats};

#[derive(Debug, Serialize)]
pub(crate) struct UpdateReport {
    pub(crate) generated_at: String,
    pub(crate) target: String,
    pub(crate) output: String,
    pub(crate) output_blake3: String,
    pub(crate) registries: Vec<RegistryStats>,
    pub(crate) index_size: usize,
    /// Indexed prefixes per block size in bits (24, 28, 36, ...).
    pub(crate) prefix_bits: BTreeMap<usize, usize>,
    pub(crate) collisions: usize,
    pub(crate) enhance: EnhanceReport,
}

impl UpdateReport {
    pub(crate) fn missing_sources(&self) -> usize {
        self.registries.iter().filter(|r| r.missing).count()
    }

    pub(crate) fn skipped_rows(&self) -> usize {
        self.registries
            .iter()
            .map(|r| r.malformed_rows + r.empty_rows)
            .sum()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SourceEntry {
    pub(crate) kind: &'static str,
    pub(crate) url: String,
    pub(crate) path: String,
    pub(crate) present: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CanonicalName {
    pub(crate) raw: String,
    pub(crate) canonical: String,
}
