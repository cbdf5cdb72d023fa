//! Thai province recognition for plate text
//!
//! Informational only: a province match never changes a verdict.

use crate::plate::PlateComponents;
use serde::Serialize;
use strsim::normalized_levenshtein;

/// The 77 provinces (76 changwat plus Bangkok), one per line
const PROVINCE_LIST: &str = include_str!("../data/thai_provinces.txt");

/// Minimum similarity for a fuzzy match
pub const FUZZY_MIN_SIMILARITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Partial,
    Fuzzy,
}

/// A province recognised in plate text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceMatch {
    pub province: &'static str,
    pub kind: MatchKind,
    /// Normalized Levenshtein similarity between the text and the province
    pub similarity: f64,
}

impl ProvinceMatch {
    pub fn reason(&self) -> String {
        match self.kind {
            MatchKind::Exact => format!("Exact province match: {}", self.province),
            MatchKind::Partial => format!("Partial province match: {}", self.province),
            MatchKind::Fuzzy => format!(
                "Fuzzy province match: {} ({:.2})",
                self.province, self.similarity
            ),
        }
    }
}

pub fn provinces() -> impl Iterator<Item = &'static str> {
    PROVINCE_LIST.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Match one piece of Thai text against the province list
///
/// Exact matches win over partial (substring either way) matches, which win
/// over the most similar fuzzy match at or above [`FUZZY_MIN_SIMILARITY`].
pub fn match_province(text: &str) -> Option<ProvinceMatch> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(province) = provinces().find(|p| *p == text) {
        return Some(ProvinceMatch {
            province,
            kind: MatchKind::Exact,
            similarity: 1.0,
        });
    }

    if let Some(province) = provinces().find(|p| p.contains(text) || text.contains(p)) {
        return Some(ProvinceMatch {
            province,
            kind: MatchKind::Partial,
            similarity: normalized_levenshtein(text, province),
        });
    }

    provinces()
        .map(|province| (province, normalized_levenshtein(text, province)))
        .filter(|(_, similarity)| *similarity >= FUZZY_MIN_SIMILARITY)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(province, similarity)| ProvinceMatch {
            province,
            kind: MatchKind::Fuzzy,
            similarity,
        })
}

/// First province found among the Thai letter groups of a plate
pub fn match_plate(components: &PlateComponents) -> Option<ProvinceMatch> {
    components
        .thai_letters
        .iter()
        .find_map(|part| match_province(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_provinces_loaded() {
        assert_eq!(provinces().count(), 77);
        assert!(provinces().any(|p| p == "กรุงเทพมหานคร"));
    }

    #[test]
    fn test_exact_match() {
        let found = match_province(" ภูเก็ต ").unwrap();
        assert_eq!(found.province, "ภูเก็ต");
        assert_eq!(found.kind, MatchKind::Exact);
        assert_eq!(found.reason(), "Exact province match: ภูเก็ต");
    }

    #[test]
    fn test_partial_match() {
        let found = match_province("กรุงเทพ").unwrap();
        assert_eq!(found.province, "กรุงเทพมหานคร");
        assert_eq!(found.kind, MatchKind::Partial);
    }

    #[test]
    fn test_fuzzy_match_tolerates_one_misread_letter() {
        let found = match_province("นครศรีธรรมราข").unwrap();
        assert_eq!(found.province, "นครศรีธรรมราช");
        assert_eq!(found.kind, MatchKind::Fuzzy);
        assert!(found.similarity >= FUZZY_MIN_SIMILARITY);
        assert!(found.reason().starts_with("Fuzzy province match: นครศรีธรรมราช (0.9"));
    }

    #[test]
    fn test_plate_prefix_is_not_a_province() {
        assert!(match_province("กข").is_none());
        assert!(match_province("").is_none());
    }

    #[test]
    fn test_match_plate_checks_each_thai_group() {
        let components = PlateComponents::parse("กข 1234 เชียงใหม่");
        assert_eq!(match_plate(&components).unwrap().province, "เชียงใหม่");
        assert!(match_plate(&PlateComponents::parse("1234")).is_none());
    }
}
