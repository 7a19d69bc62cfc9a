use crate::error::{FaqKitError, Result};
use crate::faq::model::Lang;
use crate::normalize::formats::canonical_set;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub formats: FormatConfig,
    pub keywords: KeywordConfig,
    pub teaser: TeaserConfig,
    pub patch: PatchConfig,
    pub translate: TranslateConfig,
}

/// What to do with a deny-listed size token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadFormatPolicy {
    Replace,
    Flag,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FormatConfig {
    pub whitelist: Vec<String>,
    pub deny_list: Vec<String>,
    pub bad_policy: BadFormatPolicy,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub min_len: usize,
    pub short_exceptions: Vec<String>,
    pub column: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TeaserConfig {
    pub limit: usize,
    /// Keyed by language code (`se`, `en`, `da`, `de`).
    pub suffixes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PatchConfig {
    pub series_catalog: Option<PathBuf>,
    pub missing_marker: String,
    /// Strip sizes outside a detected series and append its format line.
    pub enforce_series: bool,
    pub product_names: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslateConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub request_delay_ms: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
    pub cache_path: PathBuf,
    pub save_every: usize,
    pub pivot: Option<Lang>,
    pub protected_terms: Vec<String>,
    /// Texts longer than this many characters are sent for shortening.
    pub shorten_max_len: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            whitelist: [
                "20x120", "40x120", "60x60", "80x80", "90x90", "120x120", "30x120", "45x90",
                "80x180",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            deny_list: [
                "0x80", "430x120", "440x120", "560x60", "860x60", "4x120", "4x60", "8x120",
                "40x180",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            bad_policy: BadFormatPolicy::Replace,
            unit: "cm".to_string(),
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            min_len: 3,
            short_exceptions: vec!["UV".to_string(), "CE".to_string()],
            column: "SE".to_string(),
        }
    }
}

impl Default for TeaserConfig {
    fn default() -> Self {
        let mut suffixes = BTreeMap::new();
        suffixes.insert("se".to_string(), " … Vill du se fler?".to_string());
        suffixes.insert("en".to_string(), " … Would you like to see more?".to_string());
        suffixes.insert("da".to_string(), " … Vil du se flere?".to_string());
        suffixes.insert("de".to_string(), " … Möchten Sie mehr sehen?".to_string());

        Self {
            limit: 200,
            suffixes,
        }
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        let mut product_names = BTreeMap::new();
        product_names.insert("KlinkerDeck".to_string(), "Klinkerdäck®".to_string());
        product_names.insert("Klinkerdeck".to_string(), "Klinkerdäck®".to_string());

        Self {
            series_catalog: None,
            missing_marker: "MISSING_TRANSLATION".to_string(),
            enforce_series: false,
            product_names,
        }
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.1,
            request_delay_ms: 1200,
            max_attempts: 1,
            retry_delay_ms: 2000,
            timeout_secs: 60,
            cache_path: PathBuf::from(".cache_faq_translate.json"),
            save_every: 20,
            pivot: None,
            protected_terms: vec!["Klinkerdäck®".to_string()],
            shorten_max_len: 250,
        }
    }
}

impl TeaserConfig {
    pub fn suffix(&self, lang: Lang) -> &str {
        self.suffixes
            .get(lang.code())
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl TranslateConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(FaqKitError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| FaqKitError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| FaqKitError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["faqkit.toml", "faqkit.config.toml", ".faqkit.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    /// Environment values win over the file, CLI flags win over both.
    pub fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("FAQKIT_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.translate.endpoint = endpoint;
            }
        }
        if let Ok(model) = std::env::var("FAQKIT_MODEL") {
            if !model.trim().is_empty() {
                self.translate.model = model;
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref cache_path) = cli_args.cache_path {
            self.translate.cache_path = cache_path.clone();
        }

        if let Some(ref model) = cli_args.model {
            self.translate.model = model.clone();
        }

        if let Some(delay) = cli_args.request_delay_ms {
            self.translate.request_delay_ms = delay;
        }

        if let Some(pivot) = cli_args.pivot {
            self.translate.pivot = Some(pivot);
        }

        if let Some(limit) = cli_args.teaser_limit {
            self.teaser.limit = limit;
        }

        if let Some(ref catalog) = cli_args.series_catalog {
            self.patch.series_catalog = Some(catalog.clone());
        }

        if let Some(ref column) = cli_args.column {
            self.keywords.column = column.clone();
        }

        if let Some(max_len) = cli_args.shorten_max_len {
            self.translate.shorten_max_len = max_len;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| FaqKitError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| FaqKitError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.formats.whitelist.is_empty() {
            return Err(FaqKitError::Config {
                message: "The format whitelist must contain at least one size".to_string(),
            });
        }

        let denied = canonical_set(&self.formats.deny_list);
        if let Some(both) = canonical_set(&self.formats.whitelist)
            .into_iter()
            .find(|w| denied.contains(w))
        {
            return Err(FaqKitError::Config {
                message: format!("Format {} is both whitelisted and deny-listed", both),
            });
        }

        if self.teaser.limit == 0 {
            return Err(FaqKitError::Config {
                message: "Teaser limit must be greater than 0".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.translate.temperature) {
            return Err(FaqKitError::Config {
                message: format!(
                    "Temperature must be between 0 and 2, got {}",
                    self.translate.temperature
                ),
            });
        }

        if self.translate.max_attempts == 0 {
            return Err(FaqKitError::Config {
                message: "max_attempts must be at least 1".to_string(),
            });
        }

        if self.translate.shorten_max_len == 0 {
            return Err(FaqKitError::Config {
                message: "shorten_max_len must be greater than 0".to_string(),
            });
        }

        if self.translate.save_every == 0 {
            return Err(FaqKitError::Config {
                message: "save_every must be greater than 0".to_string(),
            });
        }

        if let Some(pivot) = self.translate.pivot {
            if pivot.is_source() {
                return Err(FaqKitError::Config {
                    message: "Pivot language cannot be the source language".to_string(),
                });
            }
        }

        let endpoint = Url::parse(&self.translate.endpoint)?;
        if !matches!(endpoint.scheme(), "https" | "http") {
            return Err(FaqKitError::Config {
                message: format!(
                    "Endpoint must use http or https, got {}",
                    endpoint.scheme()
                ),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub cache_path: Option<PathBuf>,
    pub model: Option<String>,
    pub request_delay_ms: Option<u64>,
    pub pivot: Option<Lang>,
    pub teaser_limit: Option<usize>,
    pub series_catalog: Option<PathBuf>,
    pub column: Option<String>,
    pub shorten_max_len: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_path(mut self, cache_path: Option<PathBuf>) -> Self {
        self.cache_path = cache_path;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_request_delay_ms(mut self, delay: Option<u64>) -> Self {
        self.request_delay_ms = delay;
        self
    }

    pub fn with_pivot(mut self, pivot: Option<Lang>) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn with_teaser_limit(mut self, limit: Option<usize>) -> Self {
        self.teaser_limit = limit;
        self
    }

    pub fn with_series_catalog(mut self, catalog: Option<PathBuf>) -> Self {
        self.series_catalog = catalog;
        self
    }

    pub fn with_column(mut self, column: Option<String>) -> Self {
        self.column = column;
        self
    }

    pub fn with_shorten_max_len(mut self, max_len: Option<usize>) -> Self {
        self.shorten_max_len = max_len;
        self
    }
}
