use crate::config::KeywordConfig;
use crate::normalize::formats::{SizeFormat, SizeVariants};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const UV_KEYWORD: &str = "UV-tålig";
const CE_KEYWORD: &str = "CE-märkning";

/// Bare integers in this range are pedestal heights in millimetres.
const PEDESTAL_RANGE: std::ops::RangeInclusive<u32> = 50..=1000;

/// A bare number that was turned into a pedestal height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedestalConversion {
    pub original: String,
    pub normalized: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordList {
    pub words: Vec<String>,
    pub dropped: usize,
    pub duplicates: usize,
    pub pedestal_conversions: Vec<PedestalConversion>,
    pub size_variants: SizeVariants,
}

impl KeywordList {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

pub struct KeywordNormalizer {
    min_len: usize,
    short_exceptions: Vec<String>,
    unit: String,
}

impl KeywordNormalizer {
    pub fn new(config: &KeywordConfig, unit: &str) -> Self {
        Self {
            min_len: config.min_len,
            short_exceptions: config.short_exceptions.clone(),
            unit: unit.to_string(),
        }
    }

    pub fn normalize_keyword(&self, word: &str) -> String {
        let word = word.trim();

        if word.eq_ignore_ascii_case("uv") {
            return UV_KEYWORD.to_string();
        }
        if word.eq_ignore_ascii_case("ce") {
            return CE_KEYWORD.to_string();
        }

        if let Some(size) = SizeFormat::parse(word) {
            return size.render(&self.unit);
        }

        if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(height) = word.parse::<u32>() {
                if PEDESTAL_RANGE.contains(&height) {
                    return format!("{} mm", height);
                }
            }
        }

        word.to_string()
    }

    pub fn should_keep(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        if word == UV_KEYWORD || word == CE_KEYWORD {
            return true;
        }
        if self.short_exceptions.iter().any(|e| e == word) {
            return true;
        }
        word.chars().count() >= self.min_len
    }

    /// Normalize every word and keep the first spelling per lowercase key,
    /// in input order.
    pub fn dedupe<I, S>(&self, words: I) -> KeywordList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = KeywordList::default();
        let mut seen = HashSet::new();

        for raw in words {
            let raw = raw.as_ref();
            let normalized = self.normalize_keyword(raw);

            if !self.should_keep(&normalized) {
                list.dropped += 1;
                continue;
            }

            if let Some(size) = SizeFormat::parse(raw) {
                list.size_variants.record(&size, raw);
            }

            if !seen.insert(normalized.to_lowercase()) {
                list.duplicates += 1;
                continue;
            }

            let trimmed = raw.trim();
            if trimmed.chars().all(|c| c.is_ascii_digit()) && normalized.ends_with(" mm") {
                list.pedestal_conversions.push(PedestalConversion {
                    original: trimmed.to_string(),
                    normalized: normalized.clone(),
                });
            }

            list.words.push(normalized);
        }

        list
    }

    /// Dedupe the concatenation of both lists and sort the result.
    pub fn merge(&self, old: &[String], new: &[String]) -> KeywordList {
        let mut list = self.dedupe(old.iter().chain(new.iter()));
        list.words.sort();
        list
    }
}

impl Default for KeywordNormalizer {
    fn default() -> Self {
        Self::new(&KeywordConfig::default(), "cm")
    }
}
