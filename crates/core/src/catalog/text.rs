//! Parsing of admin form text and category display names.

use serde_json::Value;

use super::Specifications;

/// Known category codes and their display names.
pub const CATEGORIES: [(&str, &str); 4] = [
    ("pantograph", "Пантографы"),
    ("wardrobe", "Гардеробные системы"),
    ("premium", "Премиум коллекция"),
    ("kitchen", "Кухонные лифты"),
];

/// Display name for a category code. Unknown codes display as-is.
#[must_use]
pub fn category_label(code: &str) -> &str {
    CATEGORIES
        .iter()
        .find(|(known, _)| *known == code)
        .map_or(code, |(_, label)| label)
}

/// One feature per non-empty line.
#[must_use]
pub fn parse_features(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// `key: value` per line, split on the first colon.
///
/// Lines without a colon or with an empty key are skipped. Later lines win
/// when a key repeats, keeping the position of its first appearance.
#[must_use]
pub fn parse_specifications(text: &str) -> Specifications {
    let mut specs = Specifications::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        specs.insert(key.to_string(), Value::String(value.trim().to_string()));
    }
    specs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_label() {
        assert_eq!(category_label("kitchen"), "Кухонные лифты");
        assert_eq!(category_label("pantograph"), "Пантографы");
        assert_eq!(category_label("outdoor"), "outdoor");
    }

    #[test]
    fn test_parse_features_skips_blank_lines() {
        let features = parse_features("  Плавный ход \n\n\tДоводчик\n   \n");
        assert_eq!(features, vec!["Плавный ход", "Доводчик"]);
        assert!(parse_features("").is_empty());
    }

    #[test]
    fn test_parse_specifications() {
        let specs = parse_specifications("Ширина: 800 мм\nбез двоеточия\nВремя: 12:30\n : пусто");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs["Ширина"], "800 мм");
        assert_eq!(specs["Время"], "12:30");

        let keys: Vec<_> = specs.keys().cloned().collect();
        assert_eq!(keys, vec!["Ширина", "Время"]);
    }
}
