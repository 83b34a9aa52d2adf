use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::{OuiError, Result};

/// Returned when a name canonicalizes to nothing and had nothing to fall back to.
pub(crate) const UNKNOWN_ORGANIZATION: &str = "UNKNOWN";

const DEFAULT_LEGAL_TERMS: &[&str] = &[
    "a/s",
    "ab",
    "ag",
    "b v",
    "bv",
    "closed joint stock company",
    "co",
    "company",
    "corp",
    "corporate",
    "corporation",
    "gmbh",
    "holding",
    "holdings",
    "inc",
    "incorporated",
    "jsc",
    "k k",
    "kg",
    "kk",
    "limited",
    "llc",
    "ltd",
    "n v",
    "nv",
    "oao",
    "ooo",
    "open joint stock company",
    "oy",
    "oyj",
    "plc",
    "pte",
    "pty",
    "pvt",
    "s a",
    "s a s",
    "s p a",
    "s r l",
    "s r o",
    "sa",
    "sas",
    "spa",
    "srl",
    "sro",
    "the",
    "z o o",
    "zao",
];

const DEFAULT_PLACE_NAMES: &[&str] = &[
    "beijing",
    "changsha",
    "chengdu",
    "chongqing",
    "dongguan",
    "foshan",
    "fuzhou",
    "guangzhou",
    "hangzhou",
    "hefei",
    "jinan",
    "nanjing",
    "ningbo",
    "qingdao",
    "shanghai",
    "shengzen",
    "shenzhen",
    "suzhou",
    "tianjin",
    "wuhan",
    "wuxi",
    "xiamen",
    "zhongshan",
    "zhuhai",
];

const STRIPPED_PUNCTUATION: &[char] = &[
    '"', '\'', ',', '.', ':', '(', ')', '（', '）', '+', '«', '»', '“', '”', '‘', '’',
];

/// Rule tables for [`Canonicalizer`].
#[derive(Debug, Clone)]
pub(crate) struct CanonicalizerConfig {
    /// Exact raw name -> preferred output. Bypasses every other rule.
    pub(crate) special_cases: HashMap<String, String>,
    /// Company-form words removed anywhere in the name. Multi-word entries
    /// are written with single spaces and match any whitespace run.
    pub(crate) legal_terms: Vec<String>,
    /// Lower-case city names dropped when they lead the name.
    pub(crate) place_names: Vec<String>,
}

impl Default for CanonicalizerConfig {
    fn default() -> Self {
        Self {
            special_cases: HashMap::new(),
            legal_terms: DEFAULT_LEGAL_TERMS.iter().map(|s| s.to_string()).collect(),
            place_names: DEFAULT_PLACE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Turns registry legal names into short display names.
///
/// All tables are fixed at construction; `canonicalize` is a pure function
/// of its input and never fails.
#[derive(Debug)]
pub(crate) struct Canonicalizer {
    special_cases: HashMap<String, String>,
    place_names: HashSet<String>,
    paren: Regex,
    fullwidth_paren: Regex,
    legal_terms: Option<Regex>,
}

impl Canonicalizer {
    pub(crate) fn new(config: CanonicalizerConfig) -> Result<Self> {
        let paren = compile(r"\([^)]*\)")?;
        let fullwidth_paren = compile(r"（[^）]*）")?;

        let mut terms: Vec<String> = config
            .legal_terms
            .iter()
            .map(|t| collapse_whitespace(t).to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        // Longest first so "s a s" wins over "s a".
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();
        let legal_terms = if terms.is_empty() {
            None
        } else {
            let alternation = terms
                .iter()
                .map(|t| regex::escape(t).replace(' ', r"\s+"))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(&format!(r"(?i)\b(?:{alternation})\b"))?)
        };

        let place_names = config
            .place_names
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        Ok(Self {
            special_cases: config.special_cases,
            place_names,
            paren,
            fullwidth_paren,
            legal_terms,
        })
    }

    pub(crate) fn special_case_count(&self) -> usize {
        self.special_cases.len()
    }

    pub(crate) fn canonicalize(&self, raw: &str) -> String {
        if let Some(preferred) = self.special_cases.get(raw) {
            return preferred.clone();
        }

        let original = collapse_whitespace(raw);
        let mut name = original.clone();

        if is_all_upper(&name) {
            name = title_case(&name);
        }
        name = self.strip_parentheticals(&name);
        name = strip_article(&name);
        name = strip_punctuation(&name);
        name = self.strip_legal_terms(&name);
        name = self.drop_place_prefix(&name);
        name = collapse_whitespace(&name);

        if !name.is_empty() {
            name
        } else if !original.is_empty() {
            original
        } else {
            UNKNOWN_ORGANIZATION.to_string()
        }
    }

    fn strip_parentheticals(&self, name: &str) -> String {
        let name = self.paren.replace_all(name, " ");
        self.fullwidth_paren.replace_all(&name, " ").into_owned()
    }

    fn strip_legal_terms(&self, name: &str) -> String {
        let Some(terms) = &self.legal_terms else {
            return name.to_string();
        };
        let stripped = terms.replace_all(name, " ");
        if stripped.trim().is_empty() {
            name.to_string()
        } else {
            stripped.into_owned()
        }
    }

    fn drop_place_prefix(&self, name: &str) -> String {
        let mut tokens: Vec<&str> = name.split_whitespace().collect();
        while tokens.len() > 1 && self.place_names.contains(&tokens[0].to_lowercase()) {
            tokens.remove(0);
        }
        tokens.join(" ")
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| OuiError::Config {
        reason: format!("invalid canonicalization pattern {pattern:?}: {err}").into(),
    })
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_all_upper(value: &str) -> bool {
    value.chars().any(char::is_uppercase) && !value.chars().any(char::is_lowercase)
}

/// Upper-cases a letter that follows a non-letter and lower-cases the rest,
/// so `3COM` becomes `3Com` and `O'NEIL` becomes `O'Neil`.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut after_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    out
}

/// "X, a subsidiary of Y" -> "X, subsidiary of Y".
fn strip_article(value: &str) -> String {
    let mut out = value.to_string();
    while out.contains(" a ") {
        out = out.replace(" a ", " ");
    }
    out
}

fn strip_punctuation(value: &str) -> String {
    value
        .chars()
        .map(|c| if STRIPPED_PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect()
}
