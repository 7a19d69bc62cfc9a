use crate::error::{FaqKitError, Result};
use crate::faq::lookup::KeywordRecord;
use crate::faq::model::{FaqRecord, Lang};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionMatch {
    pub index: usize,
    pub lang: Lang,
    pub question: String,
    pub keywords: Vec<String>,
    pub count: usize,
}

struct Pattern {
    keyword: String,
    regex: Regex,
}

/// Finds lookup keywords inside FAQ questions, per language.
pub struct KeywordMatcher {
    patterns: BTreeMap<Lang, Vec<Pattern>>,
}

impl KeywordMatcher {
    pub fn new(records: &[KeywordRecord]) -> Result<Self> {
        let mut patterns = BTreeMap::new();

        for lang in Lang::ALL {
            let mut seen = HashSet::new();
            let mut list = Vec::new();

            for record in records {
                let keyword = record.term(lang).trim();
                if keyword.is_empty() || !seen.insert(keyword.to_lowercase()) {
                    continue;
                }

                // `\b` does not work next to symbols such as `®`, so match
                // on non-word neighbours instead.
                let regex = Regex::new(&format!(r"(?i)(?:^|\W){}(?:$|\W)", regex::escape(keyword)))
                    .map_err(|e| FaqKitError::Config {
                        message: format!("Invalid keyword '{}': {}", keyword, e),
                    })?;

                list.push(Pattern {
                    keyword: keyword.to_string(),
                    regex,
                });
            }

            patterns.insert(lang, list);
        }

        Ok(Self { patterns })
    }

    pub fn keyword_count(&self, lang: Lang) -> usize {
        self.patterns.get(&lang).map_or(0, Vec::len)
    }

    pub fn match_question(&self, lang: Lang, question: &str) -> Vec<String> {
        self.patterns
            .get(&lang)
            .map(|list| {
                list.iter()
                    .filter(|p| p.regex.is_match(question))
                    .map(|p| p.keyword.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn match_faq(&self, records: &[FaqRecord]) -> Vec<QuestionMatch> {
        let mut matches = Vec::new();

        for lang in Lang::ALL {
            for (index, record) in records.iter().enumerate() {
                let Some(entry) = record.entry(lang) else {
                    continue;
                };
                let question = entry.question.trim();
                if question.is_empty() {
                    continue;
                }

                let keywords = self.match_question(lang, question);
                matches.push(QuestionMatch {
                    index,
                    lang,
                    question: question.to_string(),
                    count: keywords.len(),
                    keywords,
                });
            }
        }

        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faq::model::FaqEntry;

    fn lookup() -> Vec<KeywordRecord> {
        vec![
            KeywordRecord::new("Klinkerdäck®", "Klinkerdäck®", "Klinkerdäck®", "Klinkerdäck®"),
            KeywordRecord::new("Frost", "Frost", "Frost", "Frost"),
            KeywordRecord::new("Plattor", "Tiles", "Fliser", "Fliesen"),
        ]
    }

    #[test]
    fn test_whole_word_case_insensitive() {
        let matcher = KeywordMatcher::new(&lookup()).unwrap();
        let found = matcher.match_question(Lang::Se, "Tål klinkerdäck® FROST?");
        assert_eq!(found, vec!["Klinkerdäck®", "Frost"]);

        // Substrings inside longer words do not count.
        assert!(matcher.match_question(Lang::Se, "Frostsäkra plattorna").is_empty());
        assert_eq!(matcher.match_question(Lang::En, "Are the tiles ok?"), vec!["Tiles"]);
    }

    #[test]
    fn test_match_faq_reports_counts() {
        let mut record = FaqRecord::swedish(FaqEntry::new("Hur lägger jag plattor?", "Svar"));
        record.de = Some(FaqEntry::new("Wie verlege ich Fliesen bei Frost?", "Antwort"));

        let matcher = KeywordMatcher::new(&lookup()).unwrap();
        let matches = matcher.match_faq(&[record]);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].lang, Lang::Se);
        assert_eq!(matches[0].count, 1);
        assert_eq!(matches[1].lang, Lang::De);
        assert_eq!(matches[1].keywords, vec!["Frost", "Fliesen"]);
        assert_eq!(matcher.keyword_count(Lang::En), 3);
    }
}
