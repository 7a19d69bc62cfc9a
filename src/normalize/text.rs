use crate::faq::model::Lang;
use std::collections::BTreeMap;

/// Words that show up in Swedish text and rarely in English, Danish or German.
const SWEDISH_MARKERS: &[&str] = &[
    "och", "är", "inte", "också", "finns", "behöver", "vilka", "hur", "våra", "måste", "eller",
];

/// Markers that are ordinary Danish words too.
const SHARED_WITH_DANISH: &[&str] = &["eller"];

/// Cut `text` to at most `limit` characters at the last space and append
/// `suffix`. Returns `None` when the text already fits.
pub fn truncate_teaser(text: &str, limit: usize, suffix: &str) -> Option<String> {
    if text.chars().count() <= limit {
        return None;
    }

    let head: String = text.chars().take(limit).collect();
    let cut = match head.rfind(' ') {
        Some(pos) if pos > 0 => &head[..pos],
        _ => head.as_str(),
    };

    Some(format!("{}{}", cut.trim_end(), suffix))
}

/// Apply product-name replacements, longest key first.
pub fn apply_product_names(text: &str, names: &BTreeMap<String, String>) -> String {
    let mut pairs: Vec<(&String, &String)> = names.iter().collect();
    pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    pairs
        .into_iter()
        .fold(text.to_string(), |acc, (from, to)| {
            if from.is_empty() {
                acc
            } else {
                acc.replace(from.as_str(), to)
            }
        })
}

pub fn starts_uppercase(text: &str) -> bool {
    text.chars().next().is_some_and(char::is_uppercase)
}

/// Uppercase the first character when it is a lowercase letter.
pub fn capitalize_first(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if !first.is_lowercase() {
        return None;
    }

    let mut result: String = first.to_uppercase().collect();
    result.push_str(chars.as_str());
    Some(result)
}

/// Heuristic for a model answer that was left (partly) in Swedish.
pub fn looks_swedish(text: &str, target: Lang) -> bool {
    if target.is_source() {
        return false;
    }

    let lower = text.to_lowercase();
    let hits = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| SWEDISH_MARKERS.contains(word))
        .filter(|word| target != Lang::Da || !SHARED_WITH_DANISH.contains(word))
        .count();

    if hits >= 2 {
        return true;
    }

    // Å, ä and ö never appear in English.
    target == Lang::En && hits >= 1 && lower.chars().any(|c| matches!(c, 'å' | 'ä' | 'ö'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_not_truncated() {
        assert_eq!(truncate_teaser("Kort svar.", 200, " … Vill du se fler?"), None);
    }

    #[test]
    fn test_truncate_at_last_space() {
        let text = "Plattorna tål frost och salt utan problem";
        let result = truncate_teaser(text, 20, " …").unwrap();
        assert_eq!(result, "Plattorna tål frost …");
    }

    #[test]
    fn test_teaser_never_exceeds_limit_plus_suffix() {
        let suffix = " … Would you like to see more?";
        let text = "word ".repeat(100);
        for limit in [10, 50, 199, 200] {
            let result = truncate_teaser(&text, limit, suffix).unwrap();
            assert!(result.chars().count() <= limit + suffix.chars().count());
        }

        let no_spaces = "å".repeat(300);
        let result = truncate_teaser(&no_spaces, 200, suffix).unwrap();
        assert_eq!(result.chars().count(), 200 + suffix.chars().count());
    }

    #[test]
    fn test_product_names() {
        let mut names = BTreeMap::new();
        names.insert("KlinkerDeck".to_string(), "Klinkerdäck®".to_string());
        names.insert("Klinkerdeck".to_string(), "Klinkerdäck®".to_string());

        let result = apply_product_names("Vårt KlinkerDeck och Klinkerdeck", &names);
        assert_eq!(result, "Vårt Klinkerdäck® och Klinkerdäck®");
        assert_eq!(apply_product_names("Klinkerdäck®", &names), "Klinkerdäck®");
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("åtgärd"), Some("Åtgärd".to_string()));
        assert_eq!(capitalize_first("Redan"), None);
        assert_eq!(capitalize_first("60x60"), None);
        assert_eq!(capitalize_first(""), None);
        assert!(starts_uppercase("Ja"));
        assert!(!starts_uppercase("ja"));
    }

    #[test]
    fn test_looks_swedish() {
        assert!(looks_swedish("Plattorna är frostsäkra och tål salt.", Lang::En));
        assert!(!looks_swedish("The tiles are frost resistant.", Lang::En));
        assert!(!looks_swedish("Die Fliesen sind frostbeständig und schön.", Lang::De));
        assert!(!looks_swedish("Fliserne er frostsikre og tåler salt.", Lang::Da));
        assert!(!looks_swedish("och är", Lang::Se));
    }

    #[test]
    fn test_danish_eller_is_not_swedish() {
        let danish = "Fliserne kan lægges på grus eller sand eller beton.";
        assert!(!looks_swedish(danish, Lang::Da));
        assert!(looks_swedish("Plattorna finns i grått eller svart eller vitt.", Lang::En));
        assert!(looks_swedish("Plattorna finns inte och behöver fog.", Lang::Da));
    }
}
