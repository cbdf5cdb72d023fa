//! Thai license plate text helpers

use crate::province::ProvinceMatch;
use serde::Serialize;

/// Thai consonants through Thai digits (ก-๙)
const THAI_RANGE: std::ops::RangeInclusive<char> = '\u{0E01}'..='\u{0E59}';

/// Numbers this long are metadata or background text, not plates
const NOISE_DIGIT_RUN: usize = 8;

/// Single characters below this confidence are treated as noise
const SINGLE_CHAR_MIN_CONFIDENCE: f32 = 0.7;

pub fn is_thai(c: char) -> bool {
    THAI_RANGE.contains(&c)
}

/// Trim and collapse whitespace runs to a single space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Letter and number groups found in a plate string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlateComponents {
    pub full_text: String,
    pub thai_letters: Vec<String>,
    pub numbers: Vec<String>,
}

impl PlateComponents {
    pub fn parse(text: &str) -> Self {
        let full_text = normalize_text(text);
        let thai_letters = runs(&full_text, is_thai);
        let numbers = runs(&full_text, |c| c.is_ascii_digit());

        Self {
            full_text,
            thai_letters,
            numbers,
        }
    }

    pub fn has_thai(&self) -> bool {
        !self.thai_letters.is_empty()
    }

    pub fn has_numbers(&self) -> bool {
        !self.numbers.is_empty()
    }

    /// Human-readable description of what the text looks like as a plate
    pub fn reason(&self, province: Option<&ProvinceMatch>) -> String {
        if let Some(province) = province {
            return format!("Valid license plate: {}", province.reason());
        }
        match (self.has_thai(), self.has_numbers()) {
            (true, true) => "Valid format: Thai letters + numbers".to_string(),
            (false, true) => format!("License number: {}", self.numbers.join(" ")),
            (true, false) => "Thai letters only".to_string(),
            (false, false) => "Invalid format: No Thai letters or numbers found".to_string(),
        }
    }
}

fn runs(text: &str, matches: impl Fn(char) -> bool) -> Vec<String> {
    let mut found = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if matches(c) {
            current.push(c);
        } else if !current.is_empty() {
            found.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        found.push(current);
    }

    found
}

/// Whether a detection is background noise rather than plate text
///
/// Noise is empty text, a bare number of eight or more digits, or a
/// single character read with confidence below 0.7.
pub fn is_noise(text: &str, confidence: f32) -> bool {
    let cleaned = normalize_text(text);
    let char_count = cleaned.chars().count();

    if char_count == 0 {
        return true;
    }
    if char_count >= NOISE_DIGIT_RUN && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }
    char_count == 1 && confidence < SINGLE_CHAR_MIN_CONFIDENCE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  กก \t 555\n"), "กก 555");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_parse_thai_plate() {
        let components = PlateComponents::parse("1กข 2345 กรุงเทพมหานคร");
        assert_eq!(components.thai_letters, vec!["กข", "กรุงเทพมหานคร"]);
        assert_eq!(components.numbers, vec!["1", "2345"]);
        assert!(components.has_thai());
        assert!(components.has_numbers());
    }

    #[test]
    fn test_parse_latin_only() {
        let components = PlateComponents::parse("abc 123");
        assert!(!components.has_thai());
        assert_eq!(components.numbers, vec!["123"]);
    }

    #[test]
    fn test_reason_describes_format() {
        let plate = PlateComponents::parse("กข 1234");
        assert_eq!(plate.reason(None), "Valid format: Thai letters + numbers");
        assert_eq!(
            PlateComponents::parse("1234 56").reason(None),
            "License number: 1234 56"
        );
        assert_eq!(
            PlateComponents::parse("abc").reason(None),
            "Invalid format: No Thai letters or numbers found"
        );
    }

    #[test]
    fn test_reason_prefers_province() {
        let plate = PlateComponents::parse("ภูเก็ต");
        let province = crate::province::match_plate(&plate);
        assert_eq!(
            plate.reason(province.as_ref()),
            "Valid license plate: Exact province match: ภูเก็ต"
        );
    }

    #[test]
    fn test_long_numbers_are_noise() {
        assert!(is_noise("12345678", 0.99));
        assert!(!is_noise("1234567", 0.99));
    }

    #[test]
    fn test_low_confidence_single_char_is_noise() {
        assert!(is_noise(" ก ", 0.5));
        assert!(!is_noise("ก", 0.8));
    }

    #[test]
    fn test_blank_is_noise() {
        assert!(is_noise("   ", 1.0));
        assert!(!is_noise("กท 2058", 0.1));
    }
}
