use crate::config::{Config, TeaserConfig};
use crate::error::{FaqKitError, Result};
use crate::faq::model::{FaqEntry, FaqRecord, Field, Lang};
use crate::faq::series::SeriesCatalog;
use crate::normalize::formats::{FormatNormalizer, INVALID_FORMAT};
use crate::normalize::text::{apply_product_names, truncate_teaser};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Fields touched by the patch pass, in processing order.
const PATCH_FIELDS: [Field; 2] = [Field::Answer, Field::AnswerFull];
const ALL_FIELDS: [Field; 3] = [Field::Question, Field::Answer, Field::AnswerFull];

/// Swedish questions with these phrases expect a series-specific answer.
const FACIT_HINTS: [&str; 2] = ["vilka färger", "format"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Missing,
    ProductName,
    Truncated,
    FormatNormalized,
    InvalidFormat,
    SeriesProtected,
    InvalidRow,
    SeriesFacit,
    Shortened,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 9] = [
        ChangeKind::Missing,
        ChangeKind::ProductName,
        ChangeKind::Truncated,
        ChangeKind::FormatNormalized,
        ChangeKind::InvalidFormat,
        ChangeKind::SeriesProtected,
        ChangeKind::InvalidRow,
        ChangeKind::SeriesFacit,
        ChangeKind::Shortened,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Missing => "MISSING",
            ChangeKind::ProductName => "PRODUCT_NAME",
            ChangeKind::Truncated => "TRUNCATED",
            ChangeKind::FormatNormalized => "FORMAT_NORMALIZED",
            ChangeKind::InvalidFormat => "INVALID_FORMAT",
            ChangeKind::SeriesProtected => "SERIES_PROTECTED",
            ChangeKind::InvalidRow => "INVALID_ROW",
            ChangeKind::SeriesFacit => "SERIES_FACIT",
            ChangeKind::Shortened => "SHORTENED",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "Index")]
    pub index: usize,
    #[serde(rename = "Lang")]
    pub lang: Lang,
    #[serde(rename = "Field")]
    pub field: String,
    #[serde(rename = "ChangeType")]
    pub kind: ChangeKind,
    #[serde(rename = "Original")]
    pub original: String,
    #[serde(rename = "Patched")]
    pub patched: String,
}

#[derive(Debug, Clone, Default)]
pub struct PatchOutcome {
    pub records: Vec<FaqRecord>,
    pub changes: Vec<ChangeRecord>,
    pub removed: usize,
}

impl PatchOutcome {
    pub fn counts(&self) -> BTreeMap<ChangeKind, usize> {
        let mut counts = BTreeMap::new();
        for change in &self.changes {
            *counts.entry(change.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn examples(&self, kind: ChangeKind, limit: usize) -> Vec<&ChangeRecord> {
        self.changes
            .iter()
            .filter(|c| c.kind == kind)
            .take(limit)
            .collect()
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FacitOutcome {
    pub patched: PatchOutcome,
    /// Color or format questions that name no series in the catalog.
    pub unmatched: Vec<String>,
}

pub struct FaqPatcher {
    formats: FormatNormalizer,
    teaser: TeaserConfig,
    product_names: BTreeMap<String, String>,
    missing_marker: String,
    enforce_series: bool,
    catalog: Option<SeriesCatalog>,
    domain_words: BTreeSet<String>,
}

impl FaqPatcher {
    pub fn new(config: &Config, catalog: Option<SeriesCatalog>) -> Self {
        let domain_words = catalog
            .as_ref()
            .map(SeriesCatalog::domain_words)
            .unwrap_or_default();

        Self {
            formats: FormatNormalizer::new(&config.formats),
            teaser: config.teaser.clone(),
            product_names: config.patch.product_names.clone(),
            missing_marker: config.patch.missing_marker.clone(),
            enforce_series: config.patch.enforce_series,
            catalog,
            domain_words,
        }
    }

    pub fn patch_all(&self, records: Vec<FaqRecord>) -> PatchOutcome {
        let mut outcome = PatchOutcome::default();
        for (index, mut record) in records.into_iter().enumerate() {
            self.patch_record(index, &mut record, &mut outcome.changes);
            outcome.records.push(record);
        }
        outcome
    }

    /// Run the full patch pass over one record.
    pub fn patch_record(&self, index: usize, record: &mut FaqRecord, changes: &mut Vec<ChangeRecord>) {
        let source = record.se.clone().unwrap_or_default();

        for lang in Lang::ALL {
            if lang != Lang::Se && record.entry(lang).is_none() && source.is_blank() {
                continue;
            }

            let series_question = record
                .entry(lang)
                .map(|e| e.question.clone())
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| source.question.clone());

            let entry = record.entry_or_default(lang);
            for field in PATCH_FIELDS {
                self.patch_field(index, lang, field, entry, &source, &series_question, changes);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn patch_field(
        &self,
        index: usize,
        lang: Lang,
        field: Field,
        entry: &mut FaqEntry,
        source: &FaqEntry,
        question: &str,
        changes: &mut Vec<ChangeRecord>,
    ) {
        let column = field.column_name(lang);
        let mut log = |kind: ChangeKind, original: &str, patched: &str| {
            changes.push(ChangeRecord {
                index,
                lang,
                field: column.clone(),
                kind,
                original: original.to_string(),
                patched: patched.to_string(),
            });
        };

        let original = entry.field(field).to_string();
        let mut text = original.clone();

        if text.trim().is_empty() {
            if lang.is_source() || source.field(field).trim().is_empty() {
                return;
            }
            text = self.missing_marker.clone();
            log(ChangeKind::Missing, &original, &text);
        }

        let renamed = apply_product_names(&text, &self.product_names);
        if renamed != text {
            log(ChangeKind::ProductName, &text, &renamed);
            text = renamed;
        }

        let mut truncated = false;
        let suffix = self.teaser.suffix(lang);
        let already_teaser = !suffix.trim().is_empty() && text.trim_end().ends_with(suffix.trim());
        if field == Field::Answer && !already_teaser {
            if let Some(teaser) = truncate_teaser(&text, self.teaser.limit, suffix) {
                if entry.field(Field::AnswerFull).trim().is_empty() {
                    entry.answer_full = Some(text.clone());
                }
                log(ChangeKind::Truncated, &text, &teaser);
                text = teaser;
                truncated = true;
            }
        }

        let series = self.catalog.as_ref().and_then(|c| c.detect(question));
        let whitelist = series.map(|s| s.whitelist());

        let outcome = self.formats.normalize_text(&text, whitelist);
        let mut normalized = outcome.text.clone();
        if let (true, Some(series)) = (self.enforce_series, series) {
            // A teaser stays within its limit, so only untruncated text gets the format line.
            if text != self.missing_marker && !truncated {
                normalized = self.formats.enforce_series(&normalized, series.whitelist(), lang);
            }
        }
        if normalized != text {
            log(ChangeKind::FormatNormalized, &text, &normalized);
            text = normalized;
        }

        if let Some(problem) = outcome.first_problem() {
            debug!(index, lang = %lang, format = %problem.canonical, "format outside whitelist");
            log(ChangeKind::InvalidFormat, &text, &text);
        }

        let lower = text.to_lowercase();
        if self.domain_words.iter().any(|w| lower.contains(w.as_str())) {
            log(ChangeKind::SeriesProtected, &text, &text);
        }

        if text != original {
            entry.set_field(field, text);
        }
    }

    /// Normalize sizes in every text field and drop records left with
    /// nothing but `INVALID_FORMAT` markers.
    pub fn formats_only(&self, records: Vec<FaqRecord>) -> PatchOutcome {
        let mut outcome = PatchOutcome::default();

        for (index, mut record) in records.into_iter().enumerate() {
            let swedish_question = record
                .entry(Lang::Se)
                .map(|e| e.question.clone())
                .unwrap_or_default();
            let mut changed_fields = Vec::new();

            for lang in Lang::ALL {
                let question = record
                    .entry(lang)
                    .map(|e| e.question.clone())
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or_else(|| swedish_question.clone());
                let whitelist = self
                    .catalog
                    .as_ref()
                    .and_then(|c| c.detect(&question))
                    .map(|s| s.whitelist());

                let Some(entry) = record.entry_mut(lang) else {
                    continue;
                };

                for field in ALL_FIELDS {
                    let original = entry.field(field).to_string();
                    if original.is_empty() {
                        continue;
                    }

                    let normalized = self.formats.normalize_text(&original, whitelist).text;
                    if normalized != original {
                        outcome.changes.push(ChangeRecord {
                            index,
                            lang,
                            field: field.column_name(lang),
                            kind: ChangeKind::FormatNormalized,
                            original,
                            patched: normalized.clone(),
                        });
                        changed_fields.push(normalized.clone());
                        entry.set_field(field, normalized);
                    }
                }
            }

            if !changed_fields.is_empty() && changed_fields.iter().all(|t| holds_only_invalid(t)) {
                debug!(index, "removing record with only invalid formats");
                outcome.changes.push(ChangeRecord {
                    index,
                    lang: Lang::Se,
                    field: "row".to_string(),
                    kind: ChangeKind::InvalidRow,
                    original: swedish_question,
                    patched: String::new(),
                });
                outcome.removed += 1;
                continue;
            }

            outcome.records.push(record);
        }

        outcome
    }
}

impl FaqPatcher {
    /// Replace the Swedish answer of every question naming a series with the
    /// catalog's reference answer.
    pub fn apply_facit(&self, records: Vec<FaqRecord>) -> Result<FacitOutcome> {
        let catalog = self.catalog.as_ref().ok_or_else(|| FaqKitError::Config {
            message: "Rewriting series answers needs a series catalog (--series-catalog)".to_string(),
        })?;
        let mut outcome = FacitOutcome::default();

        for (index, mut record) in records.into_iter().enumerate() {
            if let Some(entry) = record.entry_mut(Lang::Se) {
                match catalog.detect(&entry.question) {
                    Some(series) => {
                        let answer = catalog.facit_answer(&series.name, self.formats.unit())?;
                        if entry.answer != answer {
                            debug!(index, series = %series.name, "replacing answer with series facit");
                            let original = std::mem::replace(&mut entry.answer, answer.clone());
                            outcome.patched.changes.push(ChangeRecord {
                                index,
                                lang: Lang::Se,
                                field: Field::Answer.column_name(Lang::Se),
                                kind: ChangeKind::SeriesFacit,
                                original,
                                patched: answer,
                            });
                        }
                    }
                    None => {
                        let lower = entry.question.to_lowercase();
                        if FACIT_HINTS.iter().any(|hint| lower.contains(hint)) {
                            outcome.unmatched.push(entry.question.clone());
                        }
                    }
                }
            }
            outcome.patched.records.push(record);
        }

        Ok(outcome)
    }
}

fn holds_only_invalid(text: &str) -> bool {
    text.contains(INVALID_FORMAT)
        && !text
            .replace(INVALID_FORMAT, "")
            .chars()
            .any(char::is_alphanumeric)
}
