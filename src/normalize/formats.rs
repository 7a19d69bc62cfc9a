use crate::config::{BadFormatPolicy, FormatConfig};
use crate::faq::model::Lang;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

/// Marker written in place of a deny-listed size.
pub const INVALID_FORMAT: &str = "INVALID_FORMAT";

static WHOLE_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:,\d{1,2})?)\s*[x×]\s*(\d+(?:,\d{1,2})?)\s*(?:cm)?\s*$")
        .unwrap()
});

static SIZE_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:,\d{1,2})?)\s*[x×]\s*(\d+(?:,\d{1,2})?)(?:\s*cm)?\b").unwrap()
});

static DOUBLE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// A two-dimension tile size such as `60x60` or `26,5x180`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SizeFormat {
    pub width: String,
    pub height: String,
}

impl SizeFormat {
    /// Parse a string that consists of a single size and nothing else.
    pub fn parse(token: &str) -> Option<Self> {
        WHOLE_SIZE.captures(token).map(|caps| Self::from_captures(&caps))
    }

    fn from_captures(caps: &Captures<'_>) -> Self {
        Self {
            width: caps[1].to_string(),
            height: caps[2].to_string(),
        }
    }

    /// `WxH`, used for whitelist lookups.
    pub fn canonical(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// `WxH unit`, the form written back into text.
    pub fn render(&self, unit: &str) -> String {
        if unit.is_empty() {
            self.canonical()
        } else {
            format!("{}x{} {}", self.width, self.height, unit)
        }
    }
}

impl fmt::Display for SizeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatStatus {
    Valid,
    Unknown,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatFinding {
    pub original: String,
    pub canonical: String,
    pub status: FormatStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatOutcome {
    pub text: String,
    pub findings: Vec<FormatFinding>,
}

impl FormatOutcome {
    pub fn has_problems(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.status != FormatStatus::Valid)
    }

    pub fn first_problem(&self) -> Option<&FormatFinding> {
        self.findings
            .iter()
            .find(|f| f.status != FormatStatus::Valid)
    }
}

/// Canonicalize a list entry so `60x60cm`, `60 X 60` and `60x60` compare equal.
fn canonical_entry(entry: &str) -> String {
    SizeFormat::parse(entry)
        .map(|s| s.canonical())
        .unwrap_or_else(|| entry.trim().to_lowercase().replace(' ', ""))
}

pub fn canonical_set<I, S>(entries: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|e| canonical_entry(e.as_ref()))
        .collect()
}

pub struct FormatNormalizer {
    whitelist: BTreeSet<String>,
    deny_list: BTreeSet<String>,
    bad_policy: BadFormatPolicy,
    unit: String,
}

impl FormatNormalizer {
    pub fn new(config: &FormatConfig) -> Self {
        Self {
            whitelist: canonical_set(&config.whitelist),
            deny_list: canonical_set(&config.deny_list),
            bad_policy: config.bad_policy,
            unit: config.unit.clone(),
        }
    }

    pub fn with_bad_policy(mut self, policy: BadFormatPolicy) -> Self {
        self.bad_policy = policy;
        self
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The deny-list always wins, then the series whitelist if one is given,
    /// otherwise the global whitelist.
    pub fn classify(&self, size: &SizeFormat, series: Option<&BTreeSet<String>>) -> FormatStatus {
        let canonical = size.canonical();

        if self.deny_list.contains(&canonical) {
            return FormatStatus::Bad;
        }

        let allowed = series.unwrap_or(&self.whitelist);
        if allowed.contains(&canonical) {
            FormatStatus::Valid
        } else {
            FormatStatus::Unknown
        }
    }

    pub fn normalize_text(&self, text: &str, series: Option<&BTreeSet<String>>) -> FormatOutcome {
        let mut findings = Vec::new();

        let normalized = SIZE_IN_TEXT.replace_all(text, |caps: &Captures<'_>| {
            let size = SizeFormat::from_captures(caps);
            let status = self.classify(&size, series);

            findings.push(FormatFinding {
                original: caps[0].to_string(),
                canonical: size.canonical(),
                status,
            });

            match (status, self.bad_policy) {
                (FormatStatus::Bad, BadFormatPolicy::Replace) => INVALID_FORMAT.to_string(),
                (FormatStatus::Bad, BadFormatPolicy::Flag) => caps[0].to_string(),
                _ => size.render(&self.unit),
            }
        });

        FormatOutcome {
            text: normalized.into_owned(),
            findings,
        }
    }

    /// Drop every size that is not in the series whitelist and make sure the
    /// text ends with one localized line listing the allowed formats.
    pub fn enforce_series(&self, text: &str, series: &BTreeSet<String>, lang: Lang) -> String {
        let stripped = SIZE_IN_TEXT.replace_all(text, |caps: &Captures<'_>| {
            let size = SizeFormat::from_captures(caps);
            if series.contains(&size.canonical()) {
                size.render(&self.unit)
            } else {
                String::new()
            }
        });
        let mut result = DOUBLE_SPACE.replace_all(&stripped, " ").trim_end().to_string();

        let line = self.series_line(series, lang);
        if !result.contains(&line) {
            if !result.is_empty() {
                result.push('\n');
            }
            result.push_str(&line);
        }

        result
    }

    pub fn series_line(&self, series: &BTreeSet<String>, lang: Lang) -> String {
        let formats: Vec<String> = series
            .iter()
            .map(|s| match SizeFormat::parse(s) {
                Some(size) => size.render(&self.unit),
                None => s.clone(),
            })
            .collect();
        format!("{}: {}", formats_label(lang), formats.join(", "))
    }
}

impl Default for FormatNormalizer {
    fn default() -> Self {
        Self::new(&FormatConfig::default())
    }
}

pub fn formats_label(lang: Lang) -> &'static str {
    match lang {
        Lang::Se => "Tillgängliga format",
        Lang::En => "Available formats",
        Lang::Da => "Tilgængelige formater",
        Lang::De => "Verfügbare Formate",
    }
}

/// Every spelling seen for each canonical size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeVariants(BTreeMap<String, BTreeSet<String>>);

impl SizeVariants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, size: &SizeFormat, original: &str) {
        self.0
            .entry(size.canonical())
            .or_default()
            .insert(original.trim().to_string());
    }

    pub fn merge(&mut self, other: &SizeVariants) {
        for (canonical, spellings) in &other.0 {
            self.0
                .entry(canonical.clone())
                .or_default()
                .extend(spellings.iter().cloned());
        }
    }

    pub fn get(&self, canonical: &str) -> Option<&BTreeSet<String>> {
        self.0.get(canonical)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
