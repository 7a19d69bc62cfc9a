use crate::error::FaqKitError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages carried by the FAQ dataset. Swedish is always the source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[serde(alias = "sv")]
    #[value(alias = "sv")]
    Se,
    En,
    Da,
    De,
}

impl Lang {
    pub const ALL: [Lang; 4] = [Lang::Se, Lang::En, Lang::Da, Lang::De];
    pub const TARGETS: [Lang; 3] = [Lang::En, Lang::Da, Lang::De];

    pub fn code(&self) -> &'static str {
        match self {
            Lang::Se => "se",
            Lang::En => "en",
            Lang::Da => "da",
            Lang::De => "de",
        }
    }

    /// English name, used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Lang::Se => "Swedish",
            Lang::En => "English",
            Lang::Da => "Danish",
            Lang::De => "German",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Lang::Se)
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = FaqKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "se" | "sv" | "swedish" => Ok(Lang::Se),
            "en" | "english" => Ok(Lang::En),
            "da" | "danish" => Ok(Lang::Da),
            "de" | "german" => Ok(Lang::De),
            other => Err(FaqKitError::UnsupportedLanguage {
                code: other.to_string(),
            }),
        }
    }
}

/// Text fields of a single-language FAQ entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Question,
    Answer,
    AnswerFull,
}

impl Field {
    pub fn column_name(&self, lang: Lang) -> String {
        match self {
            Field::Question => format!("question_{}", lang.code()),
            Field::Answer => format!("answer_{}", lang.code()),
            Field::AnswerFull => format!("answer_full_{}", lang.code()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_full: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl FaqEntry {
    pub fn new<Q: Into<String>, A: Into<String>>(question: Q, answer: A) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            ..Self::default()
        }
    }

    pub fn with_full_answer<S: Into<String>>(mut self, full: S) -> Self {
        self.answer_full = Some(full.into());
        self
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Question => &self.question,
            Field::Answer => &self.answer,
            Field::AnswerFull => self.answer_full.as_deref().unwrap_or(""),
        }
    }

    pub fn set_field(&mut self, field: Field, value: String) {
        match field {
            Field::Question => self.question = value,
            Field::Answer => self.answer = value,
            Field::AnswerFull => self.answer_full = Some(value),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.question.trim().is_empty() && self.answer.trim().is_empty()
    }
}

/// One FAQ item across all languages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaqRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub se: Option<FaqEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<FaqEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub da: Option<FaqEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub de: Option<FaqEntry>,
}

impl FaqRecord {
    pub fn swedish(entry: FaqEntry) -> Self {
        Self {
            se: Some(entry),
            ..Self::default()
        }
    }

    pub fn entry(&self, lang: Lang) -> Option<&FaqEntry> {
        match lang {
            Lang::Se => self.se.as_ref(),
            Lang::En => self.en.as_ref(),
            Lang::Da => self.da.as_ref(),
            Lang::De => self.de.as_ref(),
        }
    }

    pub fn entry_mut(&mut self, lang: Lang) -> Option<&mut FaqEntry> {
        match lang {
            Lang::Se => self.se.as_mut(),
            Lang::En => self.en.as_mut(),
            Lang::Da => self.da.as_mut(),
            Lang::De => self.de.as_mut(),
        }
    }

    pub fn entry_or_default(&mut self, lang: Lang) -> &mut FaqEntry {
        let slot = match lang {
            Lang::Se => &mut self.se,
            Lang::En => &mut self.en,
            Lang::Da => &mut self.da,
            Lang::De => &mut self.de,
        };
        slot.get_or_insert_with(FaqEntry::default)
    }
}
