use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{collapse_whitespace, normalize_prefix, Canonicalizer, OuiError, Result};

/// Known registry column layouts, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ColumnLayout {
    /// `Registry,Assignment,Organization Name,Organization Address` (IEEE).
    AssignmentOrganization,
    /// An `Assignment` header with at least three columns: prefix in column 1, name in 2.
    AssignmentFixed,
    OuiOrganization,
    PrefixOrganization,
    MacPrefixVendor,
    /// No header matched; columns were guessed from the header width.
    Guessed,
}

impl ColumnLayout {
    const DETECTION_ORDER: [ColumnLayout; 5] = [
        ColumnLayout::AssignmentOrganization,
        ColumnLayout::AssignmentFixed,
        ColumnLayout::OuiOrganization,
        ColumnLayout::PrefixOrganization,
        ColumnLayout::MacPrefixVendor,
    ];

    fn columns(self, header: &[String]) -> Option<(usize, usize)> {
        let pair = |prefix: &str, name: &str| {
            Some((header_position(header, prefix)?, header_position(header, name)?))
        };
        match self {
            ColumnLayout::AssignmentOrganization => pair("Assignment", "Organization Name"),
            ColumnLayout::AssignmentFixed => {
                header_position(header, "Assignment")?;
                (header.len() >= 3).then_some((1, 2))
            }
            ColumnLayout::OuiOrganization => pair("OUI", "Organization"),
            ColumnLayout::PrefixOrganization => pair("Prefix", "Organization"),
            ColumnLayout::MacPrefixVendor => pair("MAC Prefix", "Vendor"),
            ColumnLayout::Guessed => None,
        }
    }

    fn mapping(self, header: &[String]) -> Option<ColumnMapping> {
        let (prefix, name) = self.columns(header)?;
        Some(ColumnMapping {
            layout: self,
            prefix,
            name,
            address: address_column(header),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnMapping {
    pub(crate) layout: ColumnLayout,
    pub(crate) prefix: usize,
    pub(crate) name: usize,
    pub(crate) address: Option<usize>,
}

impl ColumnMapping {
    fn required_len(&self) -> usize {
        self.prefix.max(self.name) + 1
    }
}

/// Try each known layout against the header row; `None` means unrecognized.
pub(crate) fn detect_layout(header: &[String]) -> Option<ColumnMapping> {
    ColumnLayout::DETECTION_ORDER
        .iter()
        .find_map(|layout| layout.mapping(header))
}

/// Degraded mapping for headers no layout recognizes.
fn guessed_mapping(header: &[String]) -> ColumnMapping {
    let (prefix, name) = if header.len() >= 3 { (1, 2) } else { (0, 1) };
    ColumnMapping {
        layout: ColumnLayout::Guessed,
        prefix,
        name,
        address: address_column(header),
    }
}

fn address_column(header: &[String]) -> Option<usize> {
    header_position(header, "Organization Address").or_else(|| header_position(header, "Address"))
}

fn header_position(header: &[String], token: &str) -> Option<usize> {
    header.iter().position(|cell| {
        cell.trim_start_matches('\u{feff}')
            .trim()
            .eq_ignore_ascii_case(token)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct OrganizationRecord {
    pub(crate) prefix: String,
    pub(crate) name: String,
    pub(crate) address: Option<String>,
}

/// Per-source load diagnostics. Nothing the loader skips goes uncounted.
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct RegistryStats {
    pub(crate) source: String,
    pub(crate) missing: bool,
    pub(crate) layout: Option<ColumnLayout>,
    pub(crate) unrecognized_layout: bool,
    pub(crate) rows: usize,
    pub(crate) records: usize,
    pub(crate) malformed_rows: usize,
    pub(crate) empty_rows: usize,
}

#[derive(Debug, Default)]
pub(crate) struct RegistryLoad {
    pub(crate) records: Vec<OrganizationRecord>,
    pub(crate) stats: RegistryStats,
}

/// Load one registry CSV. A missing file yields an empty load flagged `missing`.
pub(crate) fn load_registry(path: &Path, canonicalizer: &Canonicalizer) -> Result<RegistryLoad> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "registry file not found, skipping");
            return Ok(RegistryLoad {
                records: Vec::new(),
                stats: RegistryStats {
                    source: path.display().to_string(),
                    missing: true,
                    ..RegistryStats::default()
                },
            });
        }
        Err(err) => return Err(OuiError::io(err, path)),
    };
    tracing::info!(path = %path.display(), "loading registry");
    parse_registry(file, path, canonicalizer)
}

/// Parse registry rows from any reader; `source` is used for diagnostics only.
pub(crate) fn parse_registry<R: Read>(
    reader: R,
    source: &Path,
    canonicalizer: &Canonicalizer,
) -> Result<RegistryLoad> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut load = RegistryLoad {
        records: Vec::new(),
        stats: RegistryStats {
            source: source.display().to_string(),
            ..RegistryStats::default()
        },
    };
    let mut mapping: Option<ColumnMapping> = None;

    for result in csv_reader.byte_records() {
        let record = result.map_err(|err| OuiError::parse(source, err.to_string()))?;
        let row: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).trim().to_string())
            .collect();

        let Some(columns) = mapping else {
            let detected = detect_layout(&row).unwrap_or_else(|| {
                tracing::warn!(
                    source = %source.display(),
                    header = ?row,
                    "unrecognized registry header, guessing columns"
                );
                load.stats.unrecognized_layout = true;
                guessed_mapping(&row)
            });
            tracing::debug!(source = %source.display(), layout = ?detected.layout, "registry layout");
            load.stats.layout = Some(detected.layout);
            mapping = Some(detected);
            continue;
        };

        load.stats.rows += 1;
        if row.len() < columns.required_len() {
            tracing::debug!(
                source = %source.display(),
                line = ?record.position().map(|p| p.line()),
                "skipping short registry row"
            );
            load.stats.malformed_rows += 1;
            continue;
        }

        let prefix = normalize_prefix(&row[columns.prefix]);
        let raw_name = row[columns.name].as_str();
        if prefix.is_empty() || raw_name.is_empty() {
            load.stats.empty_rows += 1;
            continue;
        }

        let address = columns
            .address
            .and_then(|idx| row.get(idx))
            .map(|value| collapse_whitespace(value))
            .filter(|value| !value.is_empty());

        load.records.push(OrganizationRecord {
            prefix,
            name: canonicalizer.canonicalize(raw_name),
            address,
        });
    }

    load.stats.records = load.records.len();
    tracing::info!(
        source = %source.display(),
        records = load.stats.records,
        malformed = load.stats.malformed_rows,
        empty = load.stats.empty_rows,
        "registry loaded"
    );
    Ok(load)
}

/// Load every registry in order; later sources take precedence in the index.
pub(crate) fn load_registries(
    paths: &[PathBuf],
    canonicalizer: &Canonicalizer,
) -> Result<Vec<RegistryLoad>> {
    paths
        .iter()
        .map(|path| load_registry(path, canonicalizer))
        .collect()
}
