use crate::faq::model::Lang;
use serde::{Deserialize, Serialize};
use std::fmt;

const DELIVERY_STEMS: &[&str] = &[
    "leverans", "hemleverans", "frakt", "pris", "avgift", "kostnad", "tid", "leveranstid",
];

const MAINTENANCE_STEMS: &[&str] = &[
    "olja", "underhåll", "underhållsolja", "skötsel", "impregnering", "mossa", "alger", "salt",
    "kemikalier", "frost", "vinter", "rengöring", "tvätt",
];

const PRODUCT_STEMS: &[&str] = &[
    "klinker", "klinkerdäck", "platta", "plattor", "betong", "mått", "storlek", "dimension",
    "ytstruktur", "struktur", "färg", "design", "vikt", "tjocklek", "kapning", "sågning",
];

const DOMAIN_STEMS: &[&str] = &[
    "klinker", "klinkerdäck", "betong", "impregnering", "underhåll", "underhållsolja", "skötsel",
    "mossa", "alger", "frost", "salt", "kemikalier", "ytstruktur", "kapning", "sågning",
    "hemleverans", "leverans",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Leverans")]
    Delivery,
    #[serde(rename = "Underhåll")]
    Maintenance,
    #[serde(rename = "Produkt")]
    Product,
    #[serde(rename = "Övrigt")]
    Other,
}

impl Category {
    /// First matching stem list wins, in delivery, maintenance, product order.
    pub fn from_swedish(term: &str) -> Self {
        let lower = term.to_lowercase();
        let has = |stems: &[&str]| stems.iter().any(|s| lower.contains(s));

        if has(DELIVERY_STEMS) {
            Category::Delivery
        } else if has(MAINTENANCE_STEMS) {
            Category::Maintenance
        } else if has(PRODUCT_STEMS) {
            Category::Product
        } else {
            Category::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Delivery => "Leverans",
            Category::Maintenance => "Underhåll",
            Category::Product => "Produkt",
            Category::Other => "Övrigt",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckFlag {
    Ok,
    NeedCheck,
}

pub fn is_domain_term(term: &str) -> bool {
    let lower = term.to_lowercase();
    DOMAIN_STEMS.iter().any(|s| lower.contains(s))
}

/// A Swedish keyword with its translations, as stored in the lookup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct KeywordRecord {
    pub se: String,
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub da: String,
    #[serde(default)]
    pub de: String,
    #[serde(default = "default_check")]
    pub check: CheckFlag,
    #[serde(default = "default_category")]
    pub category: Category,
    #[serde(default)]
    pub domain: bool,
    #[serde(default)]
    pub synonyms_en: String,
    #[serde(default)]
    pub synonyms_da: String,
    #[serde(default)]
    pub synonyms_de: String,
    #[serde(default)]
    pub notes: String,
}

fn default_check() -> CheckFlag {
    CheckFlag::Ok
}

fn default_category() -> Category {
    Category::Other
}

impl KeywordRecord {
    /// Build a record and derive its check flag, category and domain flag.
    pub fn new<S: Into<String>>(se: S, en: S, da: S, de: S) -> Self {
        let mut record = Self {
            se: se.into(),
            en: en.into(),
            da: da.into(),
            de: de.into(),
            check: CheckFlag::Ok,
            category: Category::Other,
            domain: false,
            synonyms_en: String::new(),
            synonyms_da: String::new(),
            synonyms_de: String::new(),
            notes: String::new(),
        };
        record.refresh();
        record
    }

    pub fn refresh(&mut self) {
        self.check = self.compute_check();
        self.category = Category::from_swedish(&self.se);
        self.domain = is_domain_term(&self.se);
    }

    /// `NeedCheck` when the Swedish term came back unchanged in any language.
    fn compute_check(&self) -> CheckFlag {
        let se = self.se.trim().to_lowercase();
        let untranslated = [&self.en, &self.da, &self.de]
            .iter()
            .any(|t| t.trim().to_lowercase() == se);

        if untranslated {
            CheckFlag::NeedCheck
        } else {
            CheckFlag::Ok
        }
    }

    pub fn term(&self, lang: Lang) -> &str {
        match lang {
            Lang::Se => &self.se,
            Lang::En => &self.en,
            Lang::Da => &self.da,
            Lang::De => &self.de,
        }
    }

    pub fn set_term(&mut self, lang: Lang, value: String) {
        match lang {
            Lang::Se => self.se = value,
            Lang::En => self.en = value,
            Lang::Da => self.da = value,
            Lang::De => self.de = value,
        }
    }

    /// Comma-separated synonyms, `-` when the model knew none. Swedish has no
    /// synonym column.
    pub fn synonyms(&self, lang: Lang) -> &str {
        match lang {
            Lang::Se => "",
            Lang::En => &self.synonyms_en,
            Lang::Da => &self.synonyms_da,
            Lang::De => &self.synonyms_de,
        }
    }

    pub fn set_synonyms(&mut self, lang: Lang, value: String) {
        match lang {
            Lang::Se => {}
            Lang::En => self.synonyms_en = value,
            Lang::Da => self.synonyms_da = value,
            Lang::De => self.synonyms_de = value,
        }
    }
}
