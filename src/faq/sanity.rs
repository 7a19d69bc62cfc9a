use crate::faq::model::{FaqRecord, Field, Lang};
use crate::normalize::text::{capitalize_first, starts_uppercase};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LangSanity {
    pub entries: usize,
    pub empty_questions: usize,
    pub empty_answers: usize,
    pub lowercase_questions: usize,
    pub lowercase_answers: usize,
    /// Distinct questions that occur more than once.
    pub duplicated_questions: usize,
}

impl LangSanity {
    pub fn issue_count(&self) -> usize {
        self.empty_questions
            + self.empty_answers
            + self.lowercase_questions
            + self.lowercase_answers
            + self.duplicated_questions
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SanityReport {
    pub languages: BTreeMap<Lang, LangSanity>,
}

impl SanityReport {
    pub fn issue_count(&self) -> usize {
        self.languages.values().map(LangSanity::issue_count).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }

    /// One human-readable line per problem, like the report the checker prints.
    pub fn issues(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (lang, stats) in &self.languages {
            let checks = [
                (stats.empty_questions, "questions are empty"),
                (stats.empty_answers, "answers are empty"),
                (stats.lowercase_questions, "questions do not start with an uppercase letter"),
                (stats.lowercase_answers, "answers do not start with an uppercase letter"),
                (stats.duplicated_questions, "distinct questions have duplicates"),
            ];
            for (count, label) in checks {
                if count > 0 {
                    lines.push(format!("{}: {} {}", lang.code().to_uppercase(), count, label));
                }
            }
        }
        lines
    }
}

#[derive(Debug, Clone, Default)]
pub struct AutofixOutcome {
    pub records: Vec<FaqRecord>,
    pub capitalized: usize,
    pub duplicates_flagged: usize,
    pub sources_filled: usize,
}

fn duplicate_counts(records: &[FaqRecord], lang: Lang) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for entry in records.iter().filter_map(|r| r.entry(lang)) {
        let question = entry.question.trim();
        if !question.is_empty() {
            *counts.entry(question.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

pub fn check(records: &[FaqRecord]) -> SanityReport {
    let mut report = SanityReport::default();

    for lang in Lang::ALL {
        let mut stats = LangSanity::default();

        for entry in records.iter().filter_map(|r| r.entry(lang)) {
            stats.entries += 1;

            let question = entry.question.trim();
            let answer = entry.answer.trim();

            if question.is_empty() {
                stats.empty_questions += 1;
            } else if !starts_uppercase(question) {
                stats.lowercase_questions += 1;
            }

            if answer.is_empty() {
                stats.empty_answers += 1;
            } else if !starts_uppercase(answer) {
                stats.lowercase_answers += 1;
            }
        }

        stats.duplicated_questions = duplicate_counts(records, lang)
            .values()
            .filter(|&&n| n > 1)
            .count();

        if stats.entries > 0 {
            report.languages.insert(lang, stats);
        }
    }

    report
}

/// Uppercase first letters, flag duplicated questions and fill empty sources.
pub fn autofix(mut records: Vec<FaqRecord>) -> AutofixOutcome {
    let mut outcome = AutofixOutcome::default();

    for lang in Lang::ALL {
        for entry in records.iter_mut().filter_map(|r| r.entry_mut(lang)) {
            for field in [Field::Question, Field::Answer] {
                if let Some(fixed) = capitalize_first(entry.field(field)) {
                    entry.set_field(field, fixed);
                    outcome.capitalized += 1;
                }
            }

            if entry.source.as_deref().map_or(true, |s| s.trim().is_empty()) {
                entry.source = Some(UNKNOWN_SOURCE.to_string());
                outcome.sources_filled += 1;
            }
        }

        // Counted after capitalizing, so "hur ..." and "Hur ..." are one question.
        let duplicates = duplicate_counts(&records, lang);
        for entry in records.iter_mut().filter_map(|r| r.entry_mut(lang)) {
            let is_duplicate = duplicates
                .get(entry.question.trim())
                .is_some_and(|&n| n > 1);
            if is_duplicate && !entry.duplicate {
                entry.duplicate = true;
                outcome.duplicates_flagged += 1;
            }
        }
    }

    outcome.records = records;
    outcome
}
