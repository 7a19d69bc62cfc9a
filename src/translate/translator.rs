use crate::config::TranslateConfig;
use crate::error::{FaqKitError, Result};
use crate::faq::lookup::KeywordRecord;
use crate::faq::model::{FaqRecord, Field, Lang};
use crate::faq::patch::{ChangeKind, ChangeRecord};
use crate::normalize::text::looks_swedish;
use crate::translate::backend::{ChatMessage, ChatRequest, TranslationBackend};
use crate::translate::cache::TranslationCache;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const FAQ_SYSTEM_PROMPT: &str = "You are an expert in building materials, outdoor porcelain tiles, \
ceramic tiles and tile decking. Use the terms found in the industry's catalogs and product sheets. \
Keep every placeholder such as ⟦0⟧ exactly as it is. Keep list structure and line breaks. \
Reply with the translation only.";

const KEYWORD_SYSTEM_PROMPT: &str = "You are a translation expert for building materials, outdoor \
tiles, ceramic tiles and tile decking. Always use the word found in the industry's catalogs and \
product sheets. Keep every placeholder such as ⟦0⟧ exactly as it is. Reply with a single word or a \
short phrase, nothing else.";

const SHORTEN_SYSTEM_PROMPT: &str = "You are an editor for building materials, outdoor porcelain \
tiles, ceramic tiles and tile decking. Keep every placeholder such as ⟦0⟧ exactly as it is. Answer in \
the language of the text. Reply with the shortened text only.";

const SYNONYMS_SYSTEM_PROMPT: &str = "You are a terminology expert for building materials, outdoor \
tiles, ceramic tiles and tile decking. Reply with a comma-separated list only, or '-' if there are \
no common synonyms.";

const SHORTEN_TAG: &str = "short";
const SYNONYMS_TAG: &str = "syn";
const MAX_SYNONYMS: usize = 3;
const AI_SOURCE: &str = "AI";
const DEFAULT_MISSING_MARKER: &str = "MISSING_TRANSLATION";

/// Where a translation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Empty,
    Identity,
    Cache,
    Protected,
    Remote,
    Fallback,
}

impl Source {
    pub const ALL: [Source; 6] = [
        Source::Empty,
        Source::Identity,
        Source::Cache,
        Source::Protected,
        Source::Remote,
        Source::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Empty => "empty",
            Source::Identity => "identity",
            Source::Cache => "cache",
            Source::Protected => "protected",
            Source::Remote => "remote",
            Source::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Translated {
    pub text: String,
    pub source: Source,
}

impl Translated {
    fn new<S: Into<String>>(text: S, source: Source) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Faq,
    Keyword,
    Shorten,
    Synonyms,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TranslationStats {
    pub by_source: BTreeMap<Source, usize>,
    pub remote_calls: usize,
    pub strict_retries: usize,
    pub errors: Vec<String>,
}

impl TranslationStats {
    pub fn count(&self, source: Source) -> usize {
        self.by_source.get(&source).copied().unwrap_or(0)
    }

    fn record(&mut self, source: Source) {
        *self.by_source.entry(source).or_insert(0) += 1;
    }
}

/// Protected terms swapped for `⟦n⟧` before a text is sent out.
struct Masked {
    text: String,
    originals: Vec<String>,
}

impl Masked {
    fn placeholder(index: usize) -> String {
        format!("⟦{}⟧", index)
    }

    fn restore(&self, answer: &str) -> Option<String> {
        let mut restored = answer.to_string();
        for (index, original) in self.originals.iter().enumerate() {
            let placeholder = Self::placeholder(index);
            if !restored.contains(&placeholder) {
                return None;
            }
            restored = restored.replace(&placeholder, original);
        }
        Some(restored)
    }
}

/// Cache-backed translator. Requests run one at a time with a flat delay.
pub struct Translator<B: TranslationBackend> {
    backend: B,
    cache: TranslationCache,
    model: String,
    temperature: f32,
    request_delay: Duration,
    retry_delay: Duration,
    max_attempts: u32,
    save_every: usize,
    protected: Vec<String>,
    protect_regex: Option<Regex>,
    missing_marker: String,
    stats: TranslationStats,
}

impl<B: TranslationBackend> Translator<B> {
    pub fn new(backend: B, cache: TranslationCache, config: &TranslateConfig) -> Self {
        Self {
            backend,
            cache,
            model: config.model.clone(),
            temperature: config.temperature,
            request_delay: config.request_delay(),
            retry_delay: config.retry_delay(),
            max_attempts: config.max_attempts.max(1),
            save_every: config.save_every.max(1),
            protected: Vec::new(),
            protect_regex: None,
            missing_marker: DEFAULT_MISSING_MARKER.to_string(),
            stats: TranslationStats::default(),
        }
        .with_protected_terms(config.protected_terms.iter().cloned())
    }

    /// Add terms that must come back verbatim. Longer terms match first.
    pub fn with_protected_terms<I>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        for term in terms {
            let term = term.trim().to_string();
            if !term.is_empty() && !self.protected.iter().any(|p| p.eq_ignore_ascii_case(&term)) {
                self.protected.push(term);
            }
        }
        self.protected
            .sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
        self.protect_regex = build_protect_regex(&self.protected);
        self
    }

    /// Target fields holding this marker count as empty.
    pub fn with_missing_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.missing_marker = marker.into();
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn stats(&self) -> &TranslationStats {
        &self.stats
    }

    pub fn save_cache(&mut self) -> Result<()> {
        if self.cache.is_dirty() {
            self.cache.save()?;
        }
        Ok(())
    }

    /// Translate Swedish FAQ text into `target`.
    pub fn translate(&mut self, text: &str, target: Lang) -> Translated {
        self.translate_from(text, Lang::Se, target, PromptKind::Faq)
    }

    pub fn translate_keyword(&mut self, keyword: &str, target: Lang) -> Translated {
        self.translate_from(keyword, Lang::Se, target, PromptKind::Keyword)
    }

    pub fn translate_from(&mut self, text: &str, from: Lang, target: Lang, kind: PromptKind) -> Translated {
        let result = self.resolve(text, from, target, kind);
        self.stats.record(result.source);
        result
    }

    /// Shorten `text`, written in `lang`, when it runs past `max_len`
    /// characters. A failed request keeps the original text.
    pub fn shorten(&mut self, text: &str, lang: Lang, max_len: usize) -> Translated {
        let result = self.resolve_shorten(text, lang, max_len);
        self.stats.record(result.source);
        result
    }

    fn resolve_shorten(&mut self, text: &str, lang: Lang, max_len: usize) -> Translated {
        if text.trim().is_empty() {
            return Translated::new(text, Source::Empty);
        }

        if text.chars().count() <= max_len {
            return Translated::new(text, Source::Identity);
        }

        if let Some(cached) = self.cache.get_tagged(text, lang, SHORTEN_TAG) {
            return Translated::new(cached, Source::Cache);
        }

        info!(lang = %lang, orig_len = text.chars().count(), max_len, "shortening text");
        let masked = self.mask(text);
        match self.request_with_retries(&masked, lang, lang, PromptKind::Shorten) {
            Ok(short) => {
                self.cache.insert_tagged(text, lang, SHORTEN_TAG, short.clone());
                Translated::new(short, Source::Remote)
            }
            Err(e) => {
                warn!(lang = %lang, error = %e, "shortening failed, keeping original text");
                self.stats.errors.push(format!("shorten {} ({}): {}", preview(text), lang, e));
                Translated::new(text, Source::Fallback)
            }
        }
    }

    /// Up to three synonyms for a keyword in `lang`, comma-separated. `-` when
    /// there are none, empty when the request failed.
    pub fn synonyms(&mut self, term: &str, lang: Lang) -> Translated {
        let result = self.resolve_synonyms(term, lang);
        self.stats.record(result.source);
        result
    }

    fn resolve_synonyms(&mut self, term: &str, lang: Lang) -> Translated {
        if term.trim().is_empty() {
            return Translated::new("", Source::Empty);
        }

        if let Some(cached) = self.cache.get_tagged(term, lang, SYNONYMS_TAG) {
            return Translated::new(cached, Source::Cache);
        }

        // Sent unmasked: a synonym list has no place for placeholders.
        let plain = Masked {
            text: term.to_string(),
            originals: Vec::new(),
        };
        match self.request_with_retries(&plain, lang, lang, PromptKind::Synonyms) {
            Ok(answer) => {
                let list = parse_synonyms(&answer, term);
                self.cache.insert_tagged(term, lang, SYNONYMS_TAG, list.clone());
                Translated::new(list, Source::Remote)
            }
            Err(e) => {
                warn!(lang = %lang, error = %e, "synonym request failed");
                self.stats.errors.push(format!("synonyms {} ({}): {}", preview(term), lang, e));
                Translated::new("", Source::Fallback)
            }
        }
    }

    fn resolve(&mut self, text: &str, from: Lang, target: Lang, kind: PromptKind) -> Translated {
        if text.trim().is_empty() {
            return Translated::new(text, Source::Empty);
        }

        if target.is_source() || target == from {
            return Translated::new(text, Source::Identity);
        }

        if let Some(cached) = self.cache.get(text, target) {
            return Translated::new(cached, Source::Cache);
        }

        let trimmed = text.trim();
        if self.protected.iter().any(|p| p.to_lowercase() == trimmed.to_lowercase()) {
            self.cache.insert(text, target, text.to_string());
            return Translated::new(text, Source::Protected);
        }

        let masked = self.mask(text);
        match self.request_with_retries(&masked, from, target, kind) {
            Ok(translation) => {
                self.cache.insert(text, target, translation.clone());
                Translated::new(translation, Source::Remote)
            }
            Err(e) => {
                warn!(target_lang = %target, error = %e, "translation failed, keeping original text");
                self.stats
                    .errors
                    .push(format!("{} -> {}: {}", preview(text), target, e));
                Translated::new(text, Source::Fallback)
            }
        }
    }

    fn mask(&self, text: &str) -> Masked {
        let Some(regex) = &self.protect_regex else {
            return Masked {
                text: text.to_string(),
                originals: Vec::new(),
            };
        };

        let mut originals = Vec::new();
        let masked = regex.replace_all(text, |caps: &Captures<'_>| {
            originals.push(caps[0].to_string());
            Masked::placeholder(originals.len() - 1)
        });

        Masked {
            text: masked.into_owned(),
            originals,
        }
    }

    fn request_with_retries(&mut self, masked: &Masked, from: Lang, target: Lang, kind: PromptKind) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.request_once(masked, from, target, kind) {
                Ok(text) => return Ok(text),
                Err(e) => {
                    debug!(attempt, max_attempts = self.max_attempts, error = %e, "translation attempt failed");
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FaqKitError::Backend {
            message: "no attempts were made".to_string(),
        }))
    }

    fn request_once(&mut self, masked: &Masked, from: Lang, target: Lang, kind: PromptKind) -> Result<String> {
        let request = self.build_request(&masked.text, from, target, kind, false);
        let answer = self.call(request)?;
        let mut restored = masked.restore(&answer).ok_or_else(|| missing_placeholder(&answer))?;

        if from.is_source() && looks_swedish(&answer, target) {
            self.stats.strict_retries += 1;
            debug!(target_lang = %target, "answer still looks Swedish, asking again");
            let request = self.build_request(&masked.text, from, target, kind, true);
            match self.call(request) {
                Ok(strict) => match masked.restore(&strict) {
                    Some(text) => restored = text,
                    None => debug!("strict answer lost a placeholder, keeping the first answer"),
                },
                Err(e) => debug!(error = %e, "strict request failed, keeping the first answer"),
            }
        }

        Ok(restored)
    }

    fn call(&mut self, request: ChatRequest) -> Result<String> {
        if self.stats.remote_calls > 0 && !self.request_delay.is_zero() {
            thread::sleep(self.request_delay);
        }
        self.stats.remote_calls += 1;

        let answer = self.backend.complete(&request)?;
        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return Err(FaqKitError::Backend {
                message: "empty translation".to_string(),
            });
        }
        Ok(answer)
    }

    fn build_request(&self, text: &str, from: Lang, target: Lang, kind: PromptKind, strict: bool) -> ChatRequest {
        let mut system = match kind {
            PromptKind::Faq => FAQ_SYSTEM_PROMPT.to_string(),
            PromptKind::Keyword => KEYWORD_SYSTEM_PROMPT.to_string(),
            PromptKind::Shorten => SHORTEN_SYSTEM_PROMPT.to_string(),
            PromptKind::Synonyms => SYNONYMS_SYSTEM_PROMPT.to_string(),
        };
        if strict {
            system.push_str(&format!(
                " The answer MUST be written entirely in {}. Do not leave any {} words untranslated.",
                target.display_name(),
                from.display_name()
            ));
        }

        let user = match kind {
            PromptKind::Faq => format!(
                "Translate this FAQ text from {} into {}. Keep brand names, product series and colors unchanged:\n\n{}",
                from.display_name(),
                target.display_name(),
                text
            ),
            PromptKind::Keyword => format!(
                "Translate this {} keyword into {}.\n\nKeyword: \"{}\"",
                from.display_name(),
                target.display_name(),
                text
            ),
            PromptKind::Shorten => format!(
                "Shorten the following {} text to no more than two sentences, while preserving the full meaning \
                 and keeping a professional, domain-specific tone:\n\n{}",
                target.display_name(),
                text
            ),
            PromptKind::Synonyms => format!(
                "Generate up to {} common {} synonyms for this keyword.\n\nKeyword: \"{}\"",
                MAX_SYNONYMS,
                target.display_name(),
                text
            ),
        };

        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.temperature,
        }
    }

    /// Fill target-language entries from the Swedish one. With a pivot, the
    /// other targets are translated from the pivot language's text.
    /// `on_record` runs after each record; an error from it stops the run
    /// after the cache is saved.
    pub fn translate_faq<F>(
        &mut self,
        records: &mut [FaqRecord],
        targets: &[Lang],
        pivot: Option<Lang>,
        overwrite: bool,
        mut on_record: F,
    ) -> Result<usize>
    where
        F: FnMut(usize) -> Result<()>,
    {
        let order = processing_order(targets, pivot);
        let mut filled = 0;

        info!(records = records.len(), targets = ?order, pivot = ?pivot, "translating FAQ");

        for (index, record) in records.iter_mut().enumerate() {
            if let Some(source) = record.entry(Lang::Se).cloned() {
                for &target in &order {
                    let from = match pivot {
                        Some(p) if p != target && record.entry(p).is_some_and(|e| !e.is_blank()) => p,
                        _ => Lang::Se,
                    };
                    let source_entry = record.entry(from).cloned().unwrap_or_else(|| source.clone());

                    for field in [Field::Question, Field::Answer, Field::AnswerFull] {
                        let text = source_entry.field(field);
                        if text.trim().is_empty() {
                            continue;
                        }
                        let existing = record.entry(target).map(|e| e.field(field).trim().to_string());
                        if !overwrite && existing.is_some_and(|e| !e.is_empty() && e != self.missing_marker) {
                            continue;
                        }

                        let translated = self.translate_from(text, from, target, PromptKind::Faq);
                        let entry = record.entry_or_default(target);
                        entry.set_field(field, translated.text);
                        if entry.source.is_none() {
                            entry.source = Some(AI_SOURCE.to_string());
                        }
                        filled += 1;
                    }
                }
            }

            if (index + 1) % self.save_every == 0 {
                self.save_cache()?;
            }

            if let Err(e) = on_record(index) {
                self.save_cache()?;
                return Err(e);
            }
        }

        self.save_cache()?;
        Ok(filled)
    }

    /// Translate each keyword into every target and derive its lookup flags.
    /// With `synonyms`, each translation also gets a synonym list.
    pub fn translate_keywords<F>(
        &mut self,
        keywords: &[String],
        targets: &[Lang],
        synonyms: bool,
        mut on_item: F,
    ) -> Result<Vec<KeywordRecord>>
    where
        F: FnMut(usize) -> Result<()>,
    {
        let mut records = Vec::with_capacity(keywords.len());

        for (index, keyword) in keywords.iter().enumerate() {
            let mut record = KeywordRecord::new(keyword.clone(), String::new(), String::new(), String::new());
            for &target in targets {
                let translated = self.translate_keyword(keyword, target);
                if synonyms && !target.is_source() {
                    let list = self.synonyms(&translated.text, target);
                    record.set_synonyms(target, list.text);
                }
                record.set_term(target, translated.text);
            }
            record.refresh();
            records.push(record);

            if (index + 1) % self.save_every == 0 {
                self.save_cache()?;
            }

            if let Err(e) = on_item(index) {
                self.save_cache()?;
                return Err(e);
            }
        }

        self.save_cache()?;
        Ok(records)
    }

    /// Shorten question and answer fields longer than `max_len` in each of
    /// `langs`. An answer keeps its long text in `answer_full` when that is
    /// empty. Returns one change per shortened field.
    pub fn shorten_faq<F>(
        &mut self,
        records: &mut [FaqRecord],
        langs: &[Lang],
        max_len: usize,
        mut on_record: F,
    ) -> Result<Vec<ChangeRecord>>
    where
        F: FnMut(usize) -> Result<()>,
    {
        let mut changes = Vec::new();

        info!(records = records.len(), langs = ?langs, max_len, "shortening FAQ");

        for (index, record) in records.iter_mut().enumerate() {
            for &lang in langs {
                let Some(entry) = record.entry_mut(lang) else {
                    continue;
                };

                for field in [Field::Question, Field::Answer] {
                    let original = entry.field(field).to_string();
                    let shortened = self.shorten(&original, lang, max_len);
                    if !matches!(shortened.source, Source::Remote | Source::Cache) || shortened.text == original {
                        continue;
                    }

                    if field == Field::Answer && entry.field(Field::AnswerFull).trim().is_empty() {
                        entry.answer_full = Some(original.clone());
                    }
                    changes.push(ChangeRecord {
                        index,
                        lang,
                        field: field.column_name(lang),
                        kind: ChangeKind::Shortened,
                        original,
                        patched: shortened.text.clone(),
                    });
                    entry.set_field(field, shortened.text);
                }
            }

            if (index + 1) % self.save_every == 0 {
                self.save_cache()?;
            }

            if let Err(e) = on_record(index) {
                self.save_cache()?;
                return Err(e);
            }
        }

        self.save_cache()?;
        Ok(changes)
    }
}

/// Keep at most three distinct synonyms that differ from the term itself.
fn parse_synonyms(answer: &str, term: &str) -> String {
    let term = term.trim().to_lowercase();
    let mut list: Vec<String> = Vec::new();
    for candidate in answer.split([',', '\n']) {
        let candidate = candidate.trim().trim_matches(|c: char| c == '"' || c == '.' || c == '-').trim();
        if candidate.is_empty() || candidate.to_lowercase() == term {
            continue;
        }
        if !list.iter().any(|s| s.eq_ignore_ascii_case(candidate)) {
            list.push(candidate.to_string());
        }
        if list.len() == MAX_SYNONYMS {
            break;
        }
    }

    if list.is_empty() {
        "-".to_string()
    } else {
        list.join(", ")
    }
}

fn processing_order(targets: &[Lang], pivot: Option<Lang>) -> Vec<Lang> {
    let mut order: Vec<Lang> = Vec::new();
    if let Some(p) = pivot {
        order.push(p);
    }
    for &target in targets {
        if !target.is_source() && !order.contains(&target) {
            order.push(target);
        }
    }
    order
}

fn build_protect_regex(terms: &[String]) -> Option<Regex> {
    if terms.is_empty() {
        return None;
    }

    let alternatives: Vec<String> = terms
        .iter()
        .map(|term| {
            let starts_word = term.chars().next().is_some_and(char::is_alphanumeric);
            let ends_word = term.chars().last().is_some_and(char::is_alphanumeric);
            format!(
                "{}{}{}",
                if starts_word { r"\b" } else { "" },
                regex::escape(term),
                if ends_word { r"\b" } else { "" }
            )
        })
        .collect();

    match Regex::new(&format!("(?i)(?:{})", alternatives.join("|"))) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!(error = %e, "could not build protected-term pattern, terms will not be masked");
            None
        }
    }
}

fn missing_placeholder(answer: &str) -> FaqKitError {
    FaqKitError::Backend {
        message: format!("a protected term placeholder is missing from the answer: {}", preview(answer)),
    }
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(60).collect();
    if text.chars().count() > 60 {
        short.push('…');
    }
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faq::lookup::CheckFlag;
    use crate::faq::model::FaqEntry;
    use std::cell::{Cell, RefCell};

    /// Echoes a canned answer per target language and records every request.
    struct MockBackend {
        calls: Cell<usize>,
        requests: RefCell<Vec<ChatRequest>>,
        answers: RefCell<Vec<Result<String>>>,
    }

    impl MockBackend {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
                requests: RefCell::new(Vec::new()),
                answers: RefCell::new(Vec::new()),
            }
        }

        fn answering(answers: Vec<Result<String>>) -> Self {
            let backend = Self::new();
            *backend.answers.borrow_mut() = answers.into_iter().rev().collect();
            backend
        }
    }

    impl TranslationBackend for MockBackend {
        fn complete(&self, request: &ChatRequest) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            self.requests.borrow_mut().push(request.clone());

            if let Some(answer) = self.answers.borrow_mut().pop() {
                return answer;
            }

            // Default: tag the masked text with the target language name.
            let user = &request.messages[1].content;
            let text = user.rsplit("\n\n").next().unwrap_or_default();
            let target = if user.contains("into English") {
                "EN"
            } else if user.contains("into Danish") {
                "DA"
            } else {
                "DE"
            };
            Ok(format!("[{}] {}", target, text))
        }
    }

    fn config() -> TranslateConfig {
        TranslateConfig {
            request_delay_ms: 0,
            retry_delay_ms: 0,
            protected_terms: vec!["Klinkerdäck®".to_string()],
            ..TranslateConfig::default()
        }
    }

    fn translator(backend: MockBackend) -> Translator<MockBackend> {
        Translator::new(backend, TranslationCache::in_memory(), &config())
    }

    #[test]
    fn test_empty_and_identity() {
        let mut t = translator(MockBackend::new());
        assert_eq!(t.translate("  ", Lang::En).source, Source::Empty);
        assert_eq!(t.translate("Hej", Lang::Se).source, Source::Identity);
        assert_eq!(t.backend().calls.get(), 0);
    }

    #[test]
    fn test_cache_hit_never_reaches_backend() {
        let mut cache = TranslationCache::in_memory();
        cache.insert("Hej", Lang::En, "Hello".to_string());
        let mut t = Translator::new(MockBackend::new(), cache, &config());

        let result = t.translate("Hej", Lang::En);
        assert_eq!(result, Translated::new("Hello", Source::Cache));
        assert_eq!(t.backend().calls.get(), 0);
    }

    #[test]
    fn test_remote_result_is_cached() {
        let mut t = translator(MockBackend::new());
        let first = t.translate("Tål plattorna frost?", Lang::En);
        assert_eq!(first.source, Source::Remote);
        assert_eq!(first.text, "[EN] Tål plattorna frost?");

        let second = t.translate("Tål plattorna frost?", Lang::En);
        assert_eq!(second.source, Source::Cache);
        assert_eq!(t.backend().calls.get(), 1);
        assert_eq!(t.stats().count(Source::Remote), 1);
        assert_eq!(t.stats().count(Source::Cache), 1);
    }

    #[test]
    fn test_backend_failure_falls_back_uncached() {
        let backend = MockBackend::answering(vec![Err(FaqKitError::Backend {
            message: "timeout".to_string(),
        })]);
        let mut t = translator(backend);

        let result = t.translate("Tål plattorna frost?", Lang::De);
        assert_eq!(result, Translated::new("Tål plattorna frost?", Source::Fallback));
        assert!(t.cache().is_empty());
        assert_eq!(t.stats().errors.len(), 1);
    }

    #[test]
    fn test_retries_use_max_attempts() {
        let backend = MockBackend::answering(vec![
            Err(FaqKitError::Backend {
                message: "first".to_string(),
            }),
            Ok("Hello".to_string()),
        ]);
        let mut t = Translator::new(
            backend,
            TranslationCache::in_memory(),
            &TranslateConfig {
                max_attempts: 2,
                ..config()
            },
        );

        let result = t.translate("Hej", Lang::En);
        assert_eq!(result, Translated::new("Hello", Source::Remote));
        assert_eq!(t.backend().calls.get(), 2);
    }

    #[test]
    fn test_protected_whole_term() {
        let mut t = translator(MockBackend::new());
        let result = t.translate("Klinkerdäck®", Lang::Da);
        assert_eq!(result.source, Source::Protected);
        assert_eq!(t.backend().calls.get(), 0);
        assert_eq!(t.cache().get("Klinkerdäck®", Lang::Da), Some("Klinkerdäck®"));
    }

    #[test]
    fn test_protected_terms_survive_translation() {
        let mut t = translator(MockBackend::new()).with_protected_terms(vec!["Konjak".to_string()]);
        let result = t.translate("Finns Konjak som Klinkerdäck®?", Lang::En);
        assert_eq!(result.source, Source::Remote);
        assert_eq!(result.text, "[EN] Finns Konjak som Klinkerdäck®?");

        let requests = t.backend().requests.borrow();
        assert!(requests[0].messages[1].content.ends_with("Finns ⟦0⟧ som ⟦1⟧?"));
    }

    #[test]
    fn test_lost_placeholder_falls_back() {
        let backend = MockBackend::answering(vec![Ok("Is there decking?".to_string())]);
        let mut t = translator(backend);
        let result = t.translate("Finns Klinkerdäck® i lager?", Lang::En);
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.text, "Finns Klinkerdäck® i lager?");
        assert!(t.cache().is_empty());
    }

    #[test]
    fn test_swedish_answer_triggers_strict_retry() {
        let backend = MockBackend::answering(vec![
            Ok("Plattorna är frostsäkra och tål salt.".to_string()),
            Ok("The tiles are frost resistant.".to_string()),
        ]);
        let mut t = translator(backend);

        let result = t.translate("Plattorna är frostsäkra och tål salt.", Lang::En);
        assert_eq!(result.text, "The tiles are frost resistant.");
        assert_eq!(t.stats().strict_retries, 1);

        let requests = t.backend().requests.borrow();
        assert!(requests[1].messages[0].content.contains("MUST be written entirely in English"));
    }

    #[test]
    fn test_failed_strict_retry_keeps_first_answer() {
        let backend = MockBackend::answering(vec![
            Ok("Plattorna är frostsäkra och tål salt.".to_string()),
            Err(FaqKitError::Backend {
                message: "timeout".to_string(),
            }),
        ]);
        let mut t = translator(backend);

        let result = t.translate("Plattorna är frostsäkra och tål salt.", Lang::En);
        assert_eq!(
            result,
            Translated::new("Plattorna är frostsäkra och tål salt.", Source::Remote)
        );
        assert_eq!(t.stats().strict_retries, 1);
        assert_eq!(t.backend().calls.get(), 2);
    }

    #[test]
    fn test_translate_faq_with_pivot() {
        let mut records = vec![FaqRecord::swedish(FaqEntry::new("Fråga?", "Svar."))];
        let mut t = translator(MockBackend::new());

        let filled = t
            .translate_faq(&mut records, &[Lang::Da, Lang::De], Some(Lang::En), false, |_| Ok(()))
            .unwrap();

        assert_eq!(filled, 6);
        let da = records[0].entry(Lang::Da).unwrap();
        assert_eq!(da.question, "[DA] [EN] Fråga?");
        assert_eq!(da.source.as_deref(), Some("AI"));
        assert_eq!(records[0].entry(Lang::En).unwrap().answer, "[EN] Svar.");
    }

    #[test]
    fn test_translate_faq_keeps_existing_fields() {
        let mut record = FaqRecord::swedish(FaqEntry::new("Fråga?", "Svar."));
        record.en = Some(FaqEntry::new("Question?", "MISSING_TRANSLATION"));
        let mut records = vec![record];
        let mut t = translator(MockBackend::new());

        let filled = t
            .translate_faq(&mut records, &[Lang::En], None, false, |_| Ok(()))
            .unwrap();
        assert_eq!(filled, 1);
        let en = records[0].entry(Lang::En).unwrap();
        assert_eq!(en.question, "Question?");
        assert_eq!(en.answer, "[EN] Svar.");
    }

    #[test]
    fn test_cancellation_saves_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let cache = TranslationCache::load(&path).unwrap();
        let mut t = Translator::new(MockBackend::new(), cache, &config());

        let mut records = vec![
            FaqRecord::swedish(FaqEntry::new("Ett", "")),
            FaqRecord::swedish(FaqEntry::new("Två", "")),
        ];
        let result = t.translate_faq(&mut records, &[Lang::En], None, false, |_| Err(FaqKitError::Cancelled));

        assert!(matches!(result, Err(FaqKitError::Cancelled)));
        assert!(records[1].entry(Lang::En).is_none());
        let saved = TranslationCache::load(&path).unwrap();
        assert_eq!(saved.get("Ett", Lang::En), Some("[EN] Ett"));
    }

    #[test]
    fn test_translate_keywords_sets_check_flag() {
        let backend = MockBackend::answering(vec![
            Ok("Concrete".to_string()),
            Ok("Konjak".to_string()),
        ]);
        let mut t = translator(backend);

        let records = t
            .translate_keywords(&["Betong".to_string(), "Konjak".to_string()], &[Lang::En], false, |_| Ok(()))
            .unwrap();

        assert_eq!(records[0].en, "Concrete");
        assert_eq!(records[0].check, CheckFlag::Ok);
        assert_eq!(records[1].check, CheckFlag::NeedCheck);

        let requests = t.backend().requests.borrow();
        assert!(requests[0].messages[1].content.contains("Keyword: \"Betong\""));
    }

    #[test]
    fn test_translate_keywords_with_synonyms() {
        let backend = MockBackend::answering(vec![
            Ok("Moss".to_string()),
            Ok("lichen, moss, Bryophyte, algae, fungus".to_string()),
            Ok("Concrete".to_string()),
            Err(FaqKitError::Backend {
                message: "timeout".to_string(),
            }),
        ]);
        let mut t = translator(backend);

        let records = t
            .translate_keywords(&["Mossa".to_string(), "Betong".to_string()], &[Lang::En], true, |_| Ok(()))
            .unwrap();

        assert_eq!(records[0].synonyms_en, "lichen, Bryophyte, algae");
        assert_eq!(records[1].en, "Concrete");
        assert_eq!(records[1].synonyms_en, "");
        assert_eq!(t.stats().count(Source::Fallback), 1);

        let requests = t.backend().requests.borrow();
        assert!(requests[1].messages[1].content.contains("English synonyms"));
        assert!(requests[1].messages[1].content.ends_with("Keyword: \"Moss\""));
    }

    #[test]
    fn test_synonyms_none_is_dash() {
        let backend = MockBackend::answering(vec![Ok("-".to_string())]);
        let mut t = translator(backend);

        assert_eq!(t.synonyms("Klinkerdäck", Lang::De), Translated::new("-", Source::Remote));
        assert_eq!(t.synonyms("Klinkerdäck", Lang::De).source, Source::Cache);
        assert_eq!(t.cache().get("Klinkerdäck", Lang::De), None);
    }

    #[test]
    fn test_shorten_long_text() {
        let long = "Plattorna tål frost. ".repeat(20);
        let backend = MockBackend::answering(vec![Ok("Plattorna tål frost.".to_string())]);
        let mut t = translator(backend);

        let result = t.shorten(&long, Lang::Se, 250);
        assert_eq!(result, Translated::new("Plattorna tål frost.", Source::Remote));
        assert_eq!(t.stats().strict_retries, 0);

        let requests = t.backend().requests.borrow();
        assert!(requests[0].messages[1].content.starts_with("Shorten the following Swedish text"));
        drop(requests);

        assert_eq!(t.shorten(&long, Lang::Se, 250).source, Source::Cache);
        assert_eq!(t.cache().get(&long, Lang::Se), None);
        assert_eq!(t.backend().calls.get(), 1);
    }

    #[test]
    fn test_shorten_failure_keeps_original() {
        let long = "The tiles are frost resistant. ".repeat(10);
        let backend = MockBackend::answering(vec![Err(FaqKitError::Backend {
            message: "rate limited".to_string(),
        })]);
        let mut t = translator(backend);

        let result = t.shorten(&long, Lang::En, 100);
        assert_eq!(result, Translated::new(long.as_str(), Source::Fallback));
        assert!(t.cache().is_empty());
        assert_eq!(t.stats().errors.len(), 1);
    }

    #[test]
    fn test_shorten_leaves_short_text_alone() {
        let mut t = translator(MockBackend::new());
        let text = "Plattorna tål frost.";

        assert_eq!(t.shorten(text, Lang::Se, 20), Translated::new(text, Source::Identity));
        assert_eq!(t.shorten("", Lang::Se, 20).source, Source::Empty);
        assert_eq!(t.backend().calls.get(), 0);
    }

    #[test]
    fn test_shorten_faq_logs_changes() {
        let long_answer = "Klinkerdäck® läggs på plintar. ".repeat(5);
        let mut records = vec![FaqRecord::swedish(FaqEntry::new("Hur lägger man?", long_answer.clone()))];
        let backend = MockBackend::answering(vec![Ok("⟦0⟧ läggs på plintar.".to_string())]);
        let mut t = translator(backend);

        let changes = t.shorten_faq(&mut records, &[Lang::Se, Lang::En], 60, |_| Ok(())).unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Shortened);
        assert_eq!(changes[0].field, "answer_se");
        assert_eq!(changes[0].original, long_answer);

        let se = records[0].entry(Lang::Se).unwrap();
        assert_eq!(se.answer, "Klinkerdäck® läggs på plintar.");
        assert_eq!(se.answer_full.as_deref(), Some(long_answer.as_str()));
        assert_eq!(se.question, "Hur lägger man?");
    }

    #[test]
    fn test_processing_order_puts_pivot_first() {
        assert_eq!(
            processing_order(&[Lang::Da, Lang::En, Lang::Se], Some(Lang::En)),
            vec![Lang::En, Lang::Da]
        );
    }
}
