use crate::error::{FaqKitError, Result};
use crate::faq::model::Lang;
use crate::normalize::formats::{canonical_set, formats_label, SizeFormat};
use crate::store;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct SeriesEntry {
    #[serde(default)]
    formats: Vec<String>,
    #[serde(default)]
    colors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub formats: Vec<String>,
    pub colors: Vec<String>,
    whitelist: BTreeSet<String>,
    pattern: Regex,
}

impl Series {
    fn new(name: String, entry: SeriesEntry) -> Result<Self> {
        // Non-word neighbours instead of `\b`, which never matches after `®`.
        let pattern = Regex::new(&format!(r"(?i)(?:^|\W){}(?:$|\W)", regex::escape(name.trim())))
            .map_err(|e| FaqKitError::Config {
                message: format!("Invalid series name '{}': {}", name, e),
            })?;

        Ok(Self {
            whitelist: canonical_set(&entry.formats),
            formats: entry.formats,
            colors: entry.colors,
            name,
            pattern,
        })
    }

    pub fn whitelist(&self) -> &BTreeSet<String> {
        &self.whitelist
    }

    pub fn occurs_in(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// Product series with their allowed formats and colors, in file order.
#[derive(Debug, Clone, Default)]
pub struct SeriesCatalog {
    series: Vec<Series>,
}

impl SeriesCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let raw: serde_json::Map<String, serde_json::Value> = store::read_json(path)?;
        Self::from_map(raw).map_err(|e| match e {
            FaqKitError::Parse { message, .. } => FaqKitError::Parse {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        Self::from_map(raw)
    }

    fn from_map(raw: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut series = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            let entry: SeriesEntry = serde_json::from_value(value)?;
            series.push(Series::new(name, entry)?);
        }
        Ok(Self { series })
    }

    /// Build a catalog from a product map keyed `"Serie Färg"`. The first word
    /// of a key names the series and the rest is one of its colors. Formats
    /// of all colors are merged and sorted.
    pub fn from_color_keys(raw: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut grouped: Vec<(String, SeriesEntry)> = Vec::new();

        for (key, value) in raw {
            let mut words = key.split_whitespace();
            let Some(name) = words.next() else {
                continue;
            };
            let color = words.collect::<Vec<_>>().join(" ");
            let formats: Vec<String> = serde_json::from_value(value.clone())?;

            let index = match grouped.iter().position(|(n, _)| n == name) {
                Some(index) => index,
                None => {
                    grouped.push((name.to_string(), SeriesEntry::default()));
                    grouped.len() - 1
                }
            };
            let entry = &mut grouped[index].1;
            if !color.is_empty() && !entry.colors.iter().any(|c| c.to_lowercase() == color.to_lowercase()) {
                entry.colors.push(color);
            }
            entry.formats.extend(formats.into_iter().map(|f| f.trim().to_string()));
        }

        let series = grouped
            .into_iter()
            .map(|(name, mut entry)| {
                let merged: BTreeSet<String> = entry.formats.drain(..).filter(|f| !f.is_empty()).collect();
                entry.formats = merged.into_iter().collect();
                Series::new(name, entry)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { series })
    }

    /// The catalog in the shape `load` reads.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .series
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    serde_json::json!({ "formats": s.formats, "colors": s.colors }),
                )
            })
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        store::write_json(path, &self.to_json())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.iter()
    }

    pub fn get(&self, name: &str) -> Result<&Series> {
        self.series
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| FaqKitError::UnknownSeries {
                name: name.to_string(),
            })
    }

    /// First series, in catalog order, whose name occurs in `text`.
    pub fn detect(&self, text: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.occurs_in(text))
    }

    pub fn whitelist(&self, name: &str) -> Result<&BTreeSet<String>> {
        self.get(name).map(Series::whitelist)
    }

    /// Series names and colors, lowercased.
    pub fn domain_words(&self) -> BTreeSet<String> {
        self.series
            .iter()
            .flat_map(|s| std::iter::once(&s.name).chain(s.colors.iter()))
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect()
    }

    /// Domain words in their original spelling, longest first.
    pub fn protected_terms(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut terms: Vec<String> = self
            .series
            .iter()
            .flat_map(|s| std::iter::once(&s.name).chain(s.colors.iter()))
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty() && seen.insert(w.to_lowercase()))
            .collect();
        terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
        terms
    }

    /// The reference Swedish answer listing a series' colors and formats.
    pub fn facit_answer(&self, name: &str, unit: &str) -> Result<String> {
        let series = self.get(name)?;
        let formats: Vec<String> = series
            .formats
            .iter()
            .map(|f| match SizeFormat::parse(f) {
                Some(size) => size.render(unit),
                None => f.trim().to_string(),
            })
            .collect();

        Ok(format!(
            "Följande färger finns i serien {}: {}\n{}: {}",
            series.name,
            series.colors.join(", "),
            formats_label(Lang::Se),
            formats.join(", ")
        ))
    }
}
