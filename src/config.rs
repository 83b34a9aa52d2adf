use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{env_optional, env_u64, CanonicalizerConfig, OuiError, Result};

pub(crate) const DEFAULT_CONFIG_FILE: &str = "ouimap.json";
pub(crate) const DEFAULT_DATA_DIR: &str = "data";
pub(crate) const DEFAULT_OUTPUT: &str = "macaddress.io-db-enhanced.xml";
pub(crate) const DEFAULT_TARGET_URL: &str = "https://macaddress.io/database/macaddress.io-db.xml";
pub(crate) const DEFAULT_REGISTRY_URLS: &[&str] = &[
    "http://standards-oui.ieee.org/oui/oui.csv",
    "http://standards-oui.ieee.org/cid/cid.csv",
    "http://standards-oui.ieee.org/iab/iab.csv",
    "http://standards-oui.ieee.org/oui28/mam.csv",
    "http://standards-oui.ieee.org/oui36/oui36.csv",
];
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

const ENV_DATA_DIR: &str = "OUIMAP_DATA_DIR";
const ENV_OUTPUT: &str = "OUIMAP_OUTPUT";
const ENV_SPECIAL_CASES: &str = "OUIMAP_SPECIAL_CASES";
const ENV_DOWNLOAD_TIMEOUT: &str = "OUIMAP_DOWNLOAD_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub(crate) struct FileConfig {
    #[serde(default)]
    pub(crate) data_dir: Option<String>,
    #[serde(default)]
    pub(crate) output: Option<String>,
    #[serde(default)]
    pub(crate) target_url: Option<String>,
    #[serde(default)]
    pub(crate) registry_urls: Option<Vec<String>>,
    /// JSON object file mapping raw registry names to preferred names.
    #[serde(default)]
    pub(crate) special_cases_path: Option<String>,
    /// Inline special cases; these win over entries from `special_cases_path`.
    #[serde(default)]
    pub(crate) special_cases: HashMap<String, String>,
    #[serde(default)]
    pub(crate) extra_legal_terms: Vec<String>,
    #[serde(default)]
    pub(crate) extra_place_names: Vec<String>,
    #[serde(default)]
    pub(crate) download_timeout_secs: Option<u64>,
}

pub(crate) fn load_file_config(path: &Path) -> FileConfig {
    match std::fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unparsable config file");
            FileConfig::default()
        }),
        Err(_) => FileConfig::default(),
    }
}

/// Effective settings after CLI flags, environment, config file and defaults.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) data_dir: PathBuf,
    pub(crate) output: PathBuf,
    pub(crate) target_url: String,
    pub(crate) registry_urls: Vec<String>,
    pub(crate) special_cases_path: Option<PathBuf>,
    pub(crate) inline_special_cases: HashMap<String, String>,
    pub(crate) extra_legal_terms: Vec<String>,
    pub(crate) extra_place_names: Vec<String>,
    pub(crate) download_timeout: Duration,
}

impl Settings {
    pub(crate) fn resolve(
        file: FileConfig,
        cli_data_dir: Option<PathBuf>,
        cli_output: Option<PathBuf>,
    ) -> Result<Self> {
        let data_dir = pick_path(
            cli_data_dir,
            env_optional(ENV_DATA_DIR),
            file.data_dir.as_deref(),
            DEFAULT_DATA_DIR,
        );
        let output = pick_path(
            cli_output,
            env_optional(ENV_OUTPUT),
            file.output.as_deref(),
            DEFAULT_OUTPUT,
        );
        let special_cases_path = env_optional(ENV_SPECIAL_CASES)
            .or(file.special_cases_path)
            .map(PathBuf::from);
        let timeout_secs = env_u64(
            ENV_DOWNLOAD_TIMEOUT,
            file.download_timeout_secs
                .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        )?;

        Ok(Self {
            data_dir,
            output,
            target_url: file
                .target_url
                .unwrap_or_else(|| DEFAULT_TARGET_URL.to_string()),
            registry_urls: file.registry_urls.unwrap_or_else(|| {
                DEFAULT_REGISTRY_URLS.iter().map(|u| u.to_string()).collect()
            }),
            special_cases_path,
            inline_special_cases: file.special_cases,
            extra_legal_terms: file.extra_legal_terms,
            extra_place_names: file.extra_place_names,
            download_timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }

    /// Built-in rule tables extended with the configured terms and special cases.
    pub(crate) fn canonicalizer_config(&self) -> Result<CanonicalizerConfig> {
        let mut config = CanonicalizerConfig::default();
        if let Some(path) = &self.special_cases_path {
            config.special_cases = load_special_cases(path)?;
        }
        config.special_cases.extend(
            self.inline_special_cases
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        config
            .legal_terms
            .extend(self.extra_legal_terms.iter().cloned());
        config
            .place_names
            .extend(self.extra_place_names.iter().cloned());
        Ok(config)
    }
}

/// CLI flag > environment > config file > default.
pub(crate) fn pick_path(
    cli: Option<PathBuf>,
    env_value: Option<String>,
    file_value: Option<&str>,
    default: &str,
) -> PathBuf {
    if let Some(path) = cli {
        return path;
    }
    if let Some(value) = env_value {
        return PathBuf::from(value);
    }
    match file_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => PathBuf::from(value),
        None => PathBuf::from(default),
    }
}

/// A missing table is an empty table; a malformed one is an error.
pub(crate) fn load_special_cases(path: &Path) -> Result<HashMap<String, String>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no special-case table");
            return Ok(HashMap::new());
        }
        Err(err) => return Err(OuiError::io(err, path)),
    };
    let table: HashMap<String, String> =
        serde_json::from_str(&data).map_err(|err| OuiError::Config {
            reason: format!("special-case table {}: {err}", path.display()).into(),
        })?;
    tracing::info!(path = %path.display(), entries = table.len(), "special-case table loaded");
    Ok(table)
}
