//! Number extraction from OCR text.
//!
//! Recognized text is noisy: full-width digits from Japanese screens,
//! stray line breaks, thousands separators. Text is normalized first and
//! then matched against ordered label patterns.

use anyhow::{Context, Result};
use regex::Regex;

/// Default price labels, tried in order.
pub const PRICE_PATTERNS: &[&str] = &[
    r"(?i)(?:株価|現在値|終値|Price)\s*:?\s*([0-9][0-9.,]*)",
    r"(?i)(?:Last|Close)\s*:?\s*([0-9][0-9.,]*)",
];
pub const EPS_PATTERNS: &[&str] = &[r"(?i)EPS(?:\s*[(（][^)）]*[)）])?\s*:?\s*([0-9][0-9.,]*)"];
pub const BPS_PATTERNS: &[&str] = &[r"(?i)BPS(?:\s*[(（][^)）]*[)）])?\s*:?\s*([0-9][0-9.,]*)"];
pub const PER_PATTERNS: &[&str] = &[r"(?i)PER(?:\s*[(（][^)）]*[)）])?\s*:?\s*([0-9][0-9.,]*)"];
pub const PBR_PATTERNS: &[&str] = &[r"(?i)PBR(?:\s*[(（][^)）]*[)）])?\s*:?\s*([0-9][0-9.,]*)"];

/// Last resort for prices: the first number with at least three digits,
/// either grouped by thousands (`3,150`) or as a plain run (`98765`).
pub const UNLABELED_PRICE_PATTERN: &str =
    r"([0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]+)?|[0-9]{3,}(?:\.[0-9]+)?)";

/// A number pulled out of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extraction {
    pub value: f64,
    /// False when the value came from the unlabeled fallback and needs a human look
    pub confirmed: bool,
}

/// Compile a list of pattern strings.
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            let p = p.as_ref();
            Regex::new(p).with_context(|| format!("Invalid extraction pattern: {}", p))
        })
        .collect()
}

/// Normalize full-width characters and whitespace.
pub fn normalize_text(text: &str) -> String {
    let converted: String = text
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            '，' => ',',
            '．' => '.',
            '：' => ':',
            other => other,
        })
        .collect();
    converted.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_capture(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim_end_matches('.');
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// First positive number captured by any pattern, in list order.
///
/// The text is normalized before matching.
pub fn extract_number(text: &str, patterns: &[Regex]) -> Option<f64> {
    let text = normalize_text(text);
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| parse_capture(m.as_str()))
    })
}

/// Values recognized for each field of the record form.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExtractedFields {
    pub price: Option<Extraction>,
    pub eps: Option<f64>,
    pub bps: Option<f64>,
    pub per: Option<f64>,
    pub pbr: Option<f64>,
}

impl ExtractedFields {
    /// Labels of the fields that were found.
    pub fn detected(&self) -> Vec<&'static str> {
        [
            (self.price.is_some(), "Price"),
            (self.eps.is_some(), "EPS"),
            (self.bps.is_some(), "BPS"),
            (self.per.is_some(), "PER"),
            (self.pbr.is_some(), "PBR"),
        ]
        .into_iter()
        .filter_map(|(found, label)| found.then_some(label))
        .collect()
    }
}

/// Compiled pattern lists for every field.
#[derive(Debug, Clone)]
pub struct Extractor {
    price: Vec<Regex>,
    fallback: Regex,
    eps: Vec<Regex>,
    bps: Vec<Regex>,
    per: Vec<Regex>,
    pbr: Vec<Regex>,
}

impl Extractor {
    /// Build with the default patterns, or the given price patterns when non-empty.
    pub fn new(price_patterns: &[String]) -> Result<Self> {
        let price = if price_patterns.is_empty() {
            compile_patterns(PRICE_PATTERNS)?
        } else {
            compile_patterns(price_patterns)?
        };

        Ok(Self {
            price,
            fallback: Regex::new(UNLABELED_PRICE_PATTERN)?,
            eps: compile_patterns(EPS_PATTERNS)?,
            bps: compile_patterns(BPS_PATTERNS)?,
            per: compile_patterns(PER_PATTERNS)?,
            pbr: compile_patterns(PBR_PATTERNS)?,
        })
    }

    /// Labeled price if any, otherwise the unconfirmed fallback.
    pub fn extract_price(&self, text: &str) -> Option<Extraction> {
        if let Some(value) = extract_number(text, &self.price) {
            return Some(Extraction {
                value,
                confirmed: true,
            });
        }
        extract_number(text, std::slice::from_ref(&self.fallback)).map(|value| Extraction {
            value,
            confirmed: false,
        })
    }

    /// Extract every field at once.
    pub fn extract_fields(&self, text: &str) -> ExtractedFields {
        ExtractedFields {
            price: self.extract_price(text),
            eps: extract_number(text, &self.eps),
            bps: extract_number(text, &self.bps),
            per: extract_number(text, &self.per),
            pbr: extract_number(text, &self.pbr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(&[]).unwrap()
    }

    #[test]
    fn test_normalize_full_width() {
        assert_eq!(normalize_text("株価：１，２３４．５"), "株価:1,234.5");
        assert_eq!(normalize_text("  EPS \n\t 12  "), "EPS 12");
    }

    #[test]
    fn test_extract_number_strips_separators() {
        let patterns = compile_patterns(PRICE_PATTERNS).unwrap();
        assert_eq!(extract_number("Price: 1,234.50", &patterns), Some(1234.5));
        assert_eq!(extract_number("株価 ２，５００", &patterns), Some(2500.0));
        assert_eq!(extract_number("nothing here", &patterns), None);
    }

    #[test]
    fn test_extract_number_skips_non_positive() {
        let patterns = compile_patterns(&[r"A:\s*([0-9.,]+)", r"B:\s*([0-9.,]+)"]).unwrap();
        assert_eq!(extract_number("A: 0 B: 7", &patterns), Some(7.0));
        assert_eq!(extract_number("A: ,,, B: 0.0", &patterns), None);
    }

    #[test]
    fn test_first_pattern_wins() {
        let patterns = compile_patterns(&[r"Close:\s*([0-9.,]+)", r"Price:\s*([0-9.,]+)"]).unwrap();
        assert_eq!(extract_number("Price: 100 Close: 200", &patterns), Some(200.0));
    }

    #[test]
    fn test_labeled_beats_unlabeled() {
        let found = extractor().extract_price("Volume 98765 Price: 432.1").unwrap();
        assert_eq!(found.value, 432.1);
        assert!(found.confirmed);
    }

    #[test]
    fn test_unlabeled_fallback_is_unconfirmed() {
        let found = extractor().extract_price("Toyota 12 3,150 yen").unwrap();
        assert_eq!(found.value, 3150.0);
        assert!(!found.confirmed);
        assert_eq!(extractor().extract_price("ab 12 cd"), None);
    }

    #[test]
    fn test_unlabeled_fallback_needs_three_digits() {
        assert_eq!(extractor().extract_price("ab 12, cd"), None);
        assert_eq!(extractor().extract_price("vol 1,2 x"), None);
        assert_eq!(extractor().extract_price("1,2 then 12,345"), Some(Extraction { value: 12345.0, confirmed: false }));
        assert_eq!(extractor().extract_price("x 480.5 y"), Some(Extraction { value: 480.5, confirmed: false }));
    }

    #[test]
    fn test_extract_fields() {
        let text = "トヨタ 株価：３，１５０ PER（予想） 10.5 PBR 1.2 EPS: 300.25 BPS 2,600";
        let fields = extractor().extract_fields(text);
        assert_eq!(fields.price.map(|p| p.value), Some(3150.0));
        assert_eq!(fields.per, Some(10.5));
        assert_eq!(fields.pbr, Some(1.2));
        assert_eq!(fields.eps, Some(300.25));
        assert_eq!(fields.bps, Some(2600.0));
        assert_eq!(fields.detected(), vec!["Price", "EPS", "BPS", "PER", "PBR"]);
    }

    #[test]
    fn test_custom_price_patterns() {
        let custom = vec![r"終値\s*([0-9.,]+)".to_string()];
        let ex = Extractor::new(&custom).unwrap();
        assert_eq!(ex.extract_price("終値 980").unwrap().value, 980.0);
        assert!(Extractor::new(&["(unclosed".to_string()]).is_err());
    }
}
