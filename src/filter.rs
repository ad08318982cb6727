//! Record filtering by title keyword, year and volume.
//!
//! Criteria are independently optional and combined with logical AND. A year
//! or volume criterion is ignored for records that carry no year or volume.

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::paper::PaperRecord;

/// Case-insensitive title pattern.
///
/// Input that compiles as a regex is used as one; anything else is matched as
/// a literal substring.
#[derive(Debug, Clone)]
pub enum TitlePattern {
    /// A valid regular expression, compiled case-insensitively.
    Regex(Regex),
    /// A literal substring, stored lower-cased.
    Literal(String),
}

impl TitlePattern {
    /// Compiles `pattern`, falling back to a literal on regex syntax errors.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Self::Regex(regex),
            Err(error) => {
                debug!(pattern, %error, "keyword is not a valid regex, matching literally");
                Self::Literal(pattern.to_lowercase())
            }
        }
    }

    /// Returns `true` if the title matches.
    #[must_use]
    pub fn is_match(&self, title: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(title),
            Self::Literal(needle) => title.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Keep/drop predicate over harvested records.
#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    keyword: Option<TitlePattern>,
    year: Option<u16>,
    volume: Option<u32>,
}

impl PaperFilter {
    /// A filter that keeps everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the title to match `pattern`.
    #[must_use]
    pub fn with_keyword(mut self, pattern: &str) -> Self {
        self.keyword = Some(TitlePattern::new(pattern));
        self
    }

    /// Requires `record.year == year` when the record has a year.
    #[must_use]
    pub fn with_year(mut self, year: Option<u16>) -> Self {
        self.year = year;
        self
    }

    /// Requires `record.volume == volume` when the record has a volume.
    #[must_use]
    pub fn with_volume(mut self, volume: Option<u32>) -> Self {
        self.volume = volume;
        self
    }

    /// Returns `true` if the record passes every configured criterion.
    #[must_use]
    pub fn keep(&self, record: &PaperRecord) -> bool {
        if let Some(pattern) = &self.keyword
            && !pattern.is_match(&record.title)
        {
            return false;
        }
        if let (Some(wanted), Some(actual)) = (self.year, record.year)
            && wanted != actual
        {
            return false;
        }
        if let (Some(wanted), Some(actual)) = (self.volume, record.volume)
            && wanted != actual
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::PaperSource;
    use crate::venue::VenueId;

    fn record(title: &str, year: Option<u16>, volume: Option<u32>) -> PaperRecord {
        PaperRecord::new(
            title,
            VenueId::Fast,
            PaperSource::Pdf {
                url: format!("https://x.org/{title}.pdf"),
            },
        )
        .with_year(year)
        .with_volume(volume)
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = PaperFilter::new();
        assert!(filter.keep(&record("Anything", None, None)));
        assert!(filter.keep(&record("Anything", Some(1999), Some(3))));
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        let filter = PaperFilter::new().with_keyword("cache");
        assert!(filter.keep(&record("A CACHE Story", None, None)));
        assert!(filter.keep(&record("Caches everywhere", None, None)));
        assert!(!filter.keep(&record("Storage", None, None)));
    }

    #[test]
    fn test_keyword_regex() {
        let filter = PaperFilter::new().with_keyword(r"^(flash|ssd)\b");
        assert!(filter.keep(&record("SSD Wear Leveling", None, None)));
        assert!(!filter.keep(&record("Beyond SSD", None, None)));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let pattern = TitlePattern::new("C++ (");
        assert!(matches!(pattern, TitlePattern::Literal(_)));

        let filter = PaperFilter::new().with_keyword("c++ (");
        assert!(filter.keep(&record("Modern C++ (and more)", None, None)));
        assert!(!filter.keep(&record("Modern C", None, None)));
    }

    #[test]
    fn test_year_matches_or_is_absent() {
        let filter = PaperFilter::new().with_year(Some(2023));
        for (year, expected) in [(Some(2023), true), (Some(2022), false), (None, true)] {
            assert_eq!(filter.keep(&record("T", year, None)), expected, "{year:?}");
        }
    }

    #[test]
    fn test_volume_matches_or_is_absent() {
        let filter = PaperFilter::new().with_volume(Some(16));
        assert!(filter.keep(&record("T", None, Some(16))));
        assert!(!filter.keep(&record("T", None, Some(17))));
        assert!(filter.keep(&record("T", Some(2023), None)));
    }

    #[test]
    fn test_criteria_are_conjunctive() {
        let filter = PaperFilter::new().with_keyword("cache").with_year(Some(2023));
        assert!(filter.keep(&record("Cache", Some(2023), None)));
        assert!(!filter.keep(&record("Cache", Some(2022), None)));
        assert!(!filter.keep(&record("Disk", Some(2023), None)));
    }
}
