use serde::Serialize;

use crate::{
    normalize_prefix, PrefixIndex, TargetRecord, COMPANY_ADDRESS_FIELD, COMPANY_NAME_FIELD,
};

/// Placeholder the free macaddress.io export puts in withheld fields.
pub(crate) const REDACTED_SENTINEL: &str = "REDACTED_IN_FREE_VERSION_CONTACT_SUPPORT@MACADDRESS.IO";

/// Appended to addresses synthesized from the registry name. The IEEE
/// exports carry no address we can trust to replace a withheld one.
pub(crate) const DERIVED_ADDRESS_SUFFIX: &str = "(Derived from OUI)";

pub(crate) fn is_sentinel(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(REDACTED_SENTINEL)
}

pub(crate) fn derived_address(name: &str) -> String {
    format!("{name} {DERIVED_ADDRESS_SUFFIX}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct EnhanceReport {
    pub(crate) total: usize,
    pub(crate) enhanced: usize,
    pub(crate) addresses_derived: usize,
    /// Redacted records whose OUI no registry knows.
    pub(crate) unresolved: usize,
}

/// Fill redacted names and addresses from the registry index.
///
/// Each record is looked up by its own OUI with an exact match: the record
/// already states its prefix length, so a shorter registry block must not
/// stand in for it. Records without a sentinel are not touched, which makes
/// the pass idempotent.
pub(crate) fn enhance(records: &mut [TargetRecord], index: &PrefixIndex) -> EnhanceReport {
    let mut report = EnhanceReport {
        total: records.len(),
        ..EnhanceReport::default()
    };

    for record in records.iter_mut() {
        let name_redacted = record.company_name().is_some_and(is_sentinel);
        let address_redacted = record.company_address().is_some_and(is_sentinel);
        if !name_redacted && !address_redacted {
            continue;
        }

        let oui = normalize_prefix(record.oui().unwrap_or_default());
        let Some(found) = index.lookup_exact(&oui) else {
            tracing::trace!(oui = %oui, "no registry entry for redacted record");
            report.unresolved += 1;
            continue;
        };

        if name_redacted {
            record.set_field(COMPANY_NAME_FIELD, found.name.clone());
            report.enhanced += 1;
        }
        if address_redacted {
            record.set_field(COMPANY_ADDRESS_FIELD, derived_address(&found.name));
            report.addresses_derived += 1;
        }
    }

    tracing::info!(
        total = report.total,
        enhanced = report.enhanced,
        addresses = report.addresses_derived,
        unresolved = report.unresolved,
        "enhancement finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrganizationRecord, OUI_FIELD};

    fn target(oui: &str, name: &str, address: &str) -> TargetRecord {
        let mut record = TargetRecord::default();
        record.set_field(OUI_FIELD, oui);
        record.set_field(COMPANY_NAME_FIELD, name);
        record.set_field(COMPANY_ADDRESS_FIELD, address);
        record
    }

    fn index() -> PrefixIndex {
        PrefixIndex::build(vec![
            OrganizationRecord {
                prefix: "001122".to_string(),
                name: "Example".to_string(),
                address: Some("1 Main St".to_string()),
            },
            OrganizationRecord {
                prefix: "0050C2000".to_string(),
                name: "Tiny Devices".to_string(),
                address: None,
            },
        ])
    }

    #[test]
    fn test_sentinel_matching() {
        assert!(is_sentinel(REDACTED_SENTINEL));
        assert!(is_sentinel(
            "  redacted_in_free_version_contact_support@macaddress.io "
        ));
        assert!(!is_sentinel("macaddress.io"));
        assert!(!is_sentinel(""));
    }

    #[test]
    fn test_enhance_redacted_record() {
        let mut records = vec![target("00:11:22", REDACTED_SENTINEL, REDACTED_SENTINEL)];
        let report = enhance(&mut records, &index());
        assert_eq!(records[0].company_name(), Some("Example"));
        assert_eq!(
            records[0].company_address(),
            Some("Example (Derived from OUI)")
        );
        assert_eq!(
            report,
            EnhanceReport {
                total: 1,
                enhanced: 1,
                addresses_derived: 1,
                unresolved: 0,
            }
        );
    }

    #[test]
    fn test_untouched_records() {
        let clean = target("00:11:22", "Cisco Systems, Inc", "170 West Tasman Dr.");
        let mut records = vec![clean.clone()];
        let report = enhance(&mut records, &index());
        assert_eq!(records[0], clean);
        assert_eq!(report.enhanced, 0);
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_exact_lookup_only() {
        // 0050C2000 is registered, but the record claims the 24-bit block.
        let mut records = vec![target("00:50:C2", REDACTED_SENTINEL, "Somewhere")];
        let report = enhance(&mut records, &index());
        assert_eq!(records[0].company_name(), Some(REDACTED_SENTINEL));
        assert_eq!(report.unresolved, 1);

        let mut records = vec![target("00:50:C2:00:0", REDACTED_SENTINEL, "Somewhere")];
        let report = enhance(&mut records, &index());
        assert_eq!(records[0].company_name(), Some("Tiny Devices"));
        assert_eq!(records[0].company_address(), Some("Somewhere"));
        assert_eq!(report.addresses_derived, 0);
    }

    #[test]
    fn test_address_only_redaction() {
        let mut records = vec![target("001122", "Example Corp", REDACTED_SENTINEL)];
        let report = enhance(&mut records, &index());
        assert_eq!(records[0].company_name(), Some("Example Corp"));
        assert_eq!(
            records[0].company_address(),
            Some("Example (Derived from OUI)")
        );
        assert_eq!(report.enhanced, 0);
        assert_eq!(report.addresses_derived, 1);
    }

    #[test]
    fn test_idempotent() {
        let mut records = vec![
            target("00:11:22", REDACTED_SENTINEL, REDACTED_SENTINEL),
            target("FF:FF:FF", REDACTED_SENTINEL, REDACTED_SENTINEL),
            target("AA:BB:CC", "Acme", ""),
        ];
        enhance(&mut records, &index());
        let once = records.clone();
        let second = enhance(&mut records, &index());
        assert_eq!(records, once);
        assert_eq!(second.enhanced, 0);
        assert_eq!(second.addresses_derived, 0);
        assert_eq!(second.unresolved, 1);
    }

    #[test]
    fn test_record_without_oui() {
        let mut record = TargetRecord::default();
        record.set_field(COMPANY_NAME_FIELD, REDACTED_SENTINEL);
        let mut records = vec![record];
        let report = enhance(&mut records, &index());
        assert_eq!(report.unresolved, 1);
    }
}
