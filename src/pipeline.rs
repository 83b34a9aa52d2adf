use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::{
    download_file, enhance, file_digest, http_client, load_registries, local_path, prefix_bits,
    Canonicalizer, PrefixIndex, RegistryStats, Result, Settings, SourceEntry, TargetDatabase,
    UpdateReport,
};

/// Local paths of the target database and the registries, in load order.
pub(crate) fn source_paths(settings: &Settings) -> Result<(PathBuf, Vec<PathBuf>)> {
    let target = local_path(&settings.data_dir, &settings.target_url)?;
    let registries = settings
        .registry_urls
        .iter()
        .map(|url| local_path(&settings.data_dir, url))
        .collect::<Result<Vec<_>>>()?;
    Ok((target, registries))
}

pub(crate) fn source_entries(settings: &Settings) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::with_capacity(settings.registry_urls.len() + 1);
    let target = local_path(&settings.data_dir, &settings.target_url)?;
    entries.push(SourceEntry {
        kind: "database",
        url: settings.target_url.clone(),
        present: target.exists(),
        path: target.display().to_string(),
    });
    for url in &settings.registry_urls {
        let path = local_path(&settings.data_dir, url)?;
        entries.push(SourceEntry {
            kind: "registry",
            url: url.clone(),
            present: path.exists(),
            path: path.display().to_string(),
        });
    }
    Ok(entries)
}

/// Refresh every configured source. A failed download keeps whatever copy
/// is already on disk; loading decides later whether that is fatal.
pub(crate) fn download_sources(settings: &Settings) -> Result<usize> {
    let client = http_client(settings.download_timeout)?;
    let mut failed = 0;
    for url in std::iter::once(&settings.target_url).chain(&settings.registry_urls) {
        if let Err(err) = download_file(&client, url, &settings.data_dir) {
            tracing::warn!(url = %url, error = %err, "download failed, keeping local copy");
            failed += 1;
        }
    }
    Ok(failed)
}

pub(crate) fn build_canonicalizer(settings: &Settings) -> Result<Canonicalizer> {
    let canonicalizer = Canonicalizer::new(settings.canonicalizer_config()?)?;
    tracing::debug!(
        special_cases = canonicalizer.special_case_count(),
        "canonicalizer ready"
    );
    Ok(canonicalizer)
}

/// Load registries in order and merge them; later sources override earlier ones.
pub(crate) fn build_registry_index(
    paths: &[PathBuf],
    canonicalizer: &Canonicalizer,
) -> Result<(PrefixIndex, Vec<RegistryStats>)> {
    let loads = load_registries(paths, canonicalizer)?;
    let mut index = PrefixIndex::new();
    let mut stats = Vec::with_capacity(loads.len());
    for load in loads {
        for record in load.records {
            index.insert(record);
        }
        stats.push(load.stats);
    }
    if index.collisions() > 0 {
        tracing::warn!(
            collisions = index.collisions(),
            "registries disagree on some prefixes, later sources won"
        );
    }
    tracing::info!(prefixes = index.len(), "registry index built");
    Ok((index, stats))
}

pub(crate) fn prefix_bit_histogram(index: &PrefixIndex) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for record in index.iter() {
        *histogram.entry(prefix_bits(&record.prefix)).or_insert(0) += 1;
    }
    histogram
}

/// Registries + target database -> enhanced database on disk.
///
/// The target must exist; registries may be partially missing.
pub(crate) fn run_enhancement(
    settings: &Settings,
    target: &Path,
    registries: &[PathBuf],
    output: &Path,
) -> Result<UpdateReport> {
    let canonicalizer = build_canonicalizer(settings)?;
    let (index, registry_stats) = build_registry_index(registries, &canonicalizer)?;

    let mut db = TargetDatabase::load(target)?;
    let enhance_report = enhance(&mut db.records, &index);
    db.write(output)?;

    Ok(UpdateReport {
        generated_at: Utc::now().to_rfc3339(),
        target: target.display().to_string(),
        output: output.display().to_string(),
        output_blake3: file_digest(output)?,
        registries: registry_stats,
        index_size: index.len(),
        prefix_bits: prefix_bit_histogram(&index),
        collisions: index.collisions(),
        enhance: enhance_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileConfig, OuiError, REDACTED_SENTINEL};
    use std::fs;

    fn settings(dir: &Path) -> Settings {
        let mut settings =
            Settings::resolve(FileConfig::default(), Some(dir.to_path_buf()), None).unwrap();
        settings.special_cases_path = None;
        settings
    }

    fn target_xml() -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<records>
  <record>
    <oui>00:11:22</oui>
    <companyName>{REDACTED_SENTINEL}</companyName>
    <companyAddress>{REDACTED_SENTINEL}</companyAddress>
  </record>
  <record>
    <oui>70:B3:D5:12:3</oui>
    <companyName>{REDACTED_SENTINEL}</companyName>
    <companyAddress>Somewhere 1</companyAddress>
  </record>
  <record>
    <oui>AA:BB:CC</oui>
    <companyName>Kept Name</companyName>
    <companyAddress>Kept Address</companyAddress>
  </record>
</records>
"#
        )
    }

    #[test]
    fn test_end_to_end_enhancement() {
        let dir = tempfile::tempdir().unwrap();
        let oui = dir.path().join("oui.csv");
        fs::write(
            &oui,
            "Registry,Assignment,Organization Name,Organization Address\n\
             MA-L,001122,EXAMPLE CORP LTD,1 Main St\n\
             MA-L,AABBCC,Other Inc,\n",
        )
        .unwrap();
        let mas = dir.path().join("oui36.csv");
        fs::write(
            &mas,
            "Registry,Assignment,Organization Name,Organization Address\n\
             MA-S,70B3D5123,Small Batch GmbH,\n\
             MA-S,70B3D5\n",
        )
        .unwrap();
        let target = dir.path().join("macaddress.io-db.xml");
        fs::write(&target, target_xml()).unwrap();
        let output = dir.path().join("out.xml");

        let registries = vec![oui, mas, dir.path().join("cid.csv")];
        let report = run_enhancement(&settings(dir.path()), &target, &registries, &output).unwrap();

        assert_eq!(report.enhance.total, 3);
        assert_eq!(report.enhance.enhanced, 2);
        assert_eq!(report.enhance.addresses_derived, 1);
        assert_eq!(report.index_size, 3);
        assert_eq!(report.prefix_bits.get(&24), Some(&2));
        assert_eq!(report.prefix_bits.get(&36), Some(&1));
        assert_eq!(report.missing_sources(), 1);
        assert_eq!(report.skipped_rows(), 1);
        assert_eq!(report.output_blake3.len(), 64);

        let db = TargetDatabase::load(&output).unwrap();
        assert_eq!(db.records[0].company_name(), Some("Example"));
        assert_eq!(
            db.records[0].company_address(),
            Some("Example (Derived from OUI)")
        );
        assert_eq!(db.records[1].company_name(), Some("Small Batch"));
        assert_eq!(db.records[1].company_address(), Some("Somewhere 1"));
        assert_eq!(db.records[2].company_name(), Some("Kept Name"));

        // Second pass over the enhanced output changes nothing.
        let again = dir.path().join("again.xml");
        let second = run_enhancement(&settings(dir.path()), &output, &registries, &again).unwrap();
        assert_eq!(second.enhance.enhanced, 0);
        assert_eq!(second.output_blake3, report.output_blake3);
    }

    #[test]
    fn test_missing_target_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_enhancement(
            &settings(dir.path()),
            &dir.path().join("absent.xml"),
            &[],
            &dir.path().join("out.xml"),
        )
        .unwrap_err();
        assert!(matches!(err, OuiError::MissingSource { .. }));
        assert!(!dir.path().join("out.xml").exists());
    }

    #[test]
    fn test_source_paths_follow_urls() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let (target, registries) = source_paths(&settings).unwrap();
        assert_eq!(target, dir.path().join("macaddress.io-db.xml"));
        assert_eq!(registries.len(), settings.registry_urls.len());
        assert_eq!(registries[0], dir.path().join("oui.csv"));

        fs::write(&target, "<records/>").unwrap();
        let entries = source_entries(&settings).unwrap();
        assert_eq!(entries[0].kind, "database");
        assert!(entries[0].present);
        assert!(entries[1..].iter().all(|e| e.kind == "registry" && !e.present));
    }

    #[test]
    fn test_later_registry_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");
        fs::write(&first, "OUI,Organization\n001122,First Ltd\n").unwrap();
        fs::write(&second, "Prefix,Organization\n00-11-22,Second Ltd\n").unwrap();

        let canonicalizer = build_canonicalizer(&settings(dir.path())).unwrap();
        let (index, stats) = build_registry_index(&[first, second], &canonicalizer).unwrap();
        assert_eq!(index.lookup_exact("001122").unwrap().name, "Second");
        assert_eq!(index.collisions(), 1);
        assert_eq!(stats.len(), 2);
    }
}
