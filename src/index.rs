use std::collections::HashMap;

use crate::{is_sentinel, normalize_prefix, OrganizationRecord, TargetDatabase};

/// In-memory prefix -> organization map, built once per run.
///
/// Keys are normalized hex prefixes of any length. Inserting an existing key
/// replaces the previous record (last loaded wins); replacements that change
/// the organization name are counted as collisions.
#[derive(Debug, Default, Clone)]
pub(crate) struct PrefixIndex {
    entries: HashMap<String, OrganizationRecord>,
    min_len: usize,
    max_len: usize,
    collisions: usize,
}

impl PrefixIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = OrganizationRecord>,
    {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    pub(crate) fn insert(&mut self, mut record: OrganizationRecord) {
        record.prefix = normalize_prefix(&record.prefix);
        let len = record.prefix.len();
        if len == 0 {
            return;
        }
        if self.entries.is_empty() {
            self.min_len = len;
            self.max_len = len;
        } else {
            self.min_len = self.min_len.min(len);
            self.max_len = self.max_len.max(len);
        }
        if let Some(previous) = self.entries.insert(record.prefix.clone(), record) {
            let current = &self.entries[&previous.prefix];
            if current.name != previous.name {
                self.collisions += 1;
                tracing::debug!(
                    prefix = %previous.prefix,
                    previous = %previous.name,
                    current = %current.name,
                    "prefix reassigned by a later source"
                );
            }
        }
    }

    /// Exact-key lookup; the caller supplies an already normalized prefix.
    pub(crate) fn lookup_exact(&self, prefix: &str) -> Option<&OrganizationRecord> {
        self.entries.get(prefix)
    }

    /// Shortest and longest key lengths, `None` when empty.
    pub(crate) fn key_len_range(&self) -> Option<(usize, usize)> {
        (!self.entries.is_empty()).then_some((self.min_len, self.max_len))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn collisions(&self) -> usize {
        self.collisions
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &OrganizationRecord> {
        self.entries.values()
    }

    /// Index an (enhanced) target database for querying. Records whose name
    /// is still the redaction sentinel are left out.
    pub(crate) fn from_target(db: &TargetDatabase) -> Self {
        let records = db.records.iter().filter_map(|record| {
            let oui = record.oui()?;
            let name = record.company_name()?.trim();
            if name.is_empty() || is_sentinel(name) {
                return None;
            }
            let address = record
                .company_address()
                .map(str::trim)
                .filter(|a| !a.is_empty() && !is_sentinel(a))
                .map(str::to_string);
            Some(OrganizationRecord {
                prefix: oui.to_string(),
                name: name.to_string(),
                address,
            })
        });
        Self::build(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(prefix: &str, name: &str) -> OrganizationRecord {
        OrganizationRecord {
            prefix: prefix.to_string(),
            name: name.to_string(),
            address: None,
        }
    }

    #[test]
    fn test_build_and_lookup() {
        let index = PrefixIndex::build(vec![
            record("00:11:22", "Example"),
            record("0050C2000", "Tiny Devices"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup_exact("001122").unwrap().name, "Example");
        assert!(index.lookup_exact("00:11:22").is_none());
        assert!(index.lookup_exact("0050C2").is_none());
        assert_eq!(index.key_len_range(), Some((6, 9)));
    }

    #[test]
    fn test_last_loaded_wins() {
        let index = PrefixIndex::build(vec![
            record("001122", "First"),
            record("001122", "Second"),
            record("001122", "Second"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup_exact("001122").unwrap().name, "Second");
        assert_eq!(index.collisions(), 1);
    }

    #[test]
    fn test_empty_index() {
        let mut index = PrefixIndex::new();
        index.insert(record("--", "Nothing"));
        assert!(index.is_empty());
        assert_eq!(index.key_len_range(), None);
        assert_eq!(index.iter().count(), 0);
    }
}
