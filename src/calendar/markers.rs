//! Event title markers
//!
//! Duty and absence information lives in the titles of all-day events:
//!
//! - `"ab onduty"` marks `ab` as on call; `"ab onduty fixed"` pins it
//! - `"ab - urlaub"` or `"AB away"` marks `ab` as absent
//!
//! The absence words and the fixed word come from configuration.

use regex::Regex;

/// Absence words used when none are configured
pub const DEFAULT_AWAY_WORDS: &str = "away|urlaub|krank|vacation|leave|familienzeit|za";

/// Fixed word used when none is configured
pub const DEFAULT_FIXED_WORD: &str = "fixed";

/// Compiled title patterns
#[derive(Debug, Clone)]
pub struct TitleMarkers {
    duty: Regex,
    absence: Regex,
    fixed: Regex,
}

impl TitleMarkers {
    /// Compile markers for an absence word alternation and a fixed word
    pub fn new(away_words: &str, fixed_word: &str) -> Result<Self, regex::Error> {
        let duty = Regex::new(r"(?i)(\w{2,3}).*onduty")?;
        let absence = Regex::new(&format!(r"(?i)(\w{{2,3}})[\s-]+({})", away_words))?;
        let fixed = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(fixed_word.trim())))?;
        Ok(Self {
            duty,
            absence,
            fixed,
        })
    }

    /// Parse a duty title into `(code, fixed)`
    pub fn parse_duty(&self, title: &str) -> Option<(String, bool)> {
        let fixed = self.fixed.is_match(title);
        let stripped = if fixed {
            self.fixed.replace_all(title, "").into_owned()
        } else {
            title.to_string()
        };
        self.duty
            .captures(&stripped)
            .and_then(|caps| caps.get(1))
            .map(|m| (m.as_str().to_lowercase(), fixed))
    }

    /// Parse an absence title into the absent code
    pub fn parse_absence(&self, title: &str) -> Option<String> {
        self.absence
            .captures(title)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_lowercase())
    }

    /// Title written for a duty entry
    pub fn duty_title(code: &str) -> String {
        format!("{} onduty", code)
    }
}

impl Default for TitleMarkers {
    fn default() -> Self {
        // Both patterns are built from constants and always compile.
        Self::new(DEFAULT_AWAY_WORDS, DEFAULT_FIXED_WORD)
            .expect("default title markers must compile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duty() {
        let markers = TitleMarkers::default();

        assert_eq!(markers.parse_duty("ab onduty"), Some(("ab".into(), false)));
        assert_eq!(markers.parse_duty("ABC OnDuty"), Some(("abc".into(), false)));
        assert_eq!(markers.parse_duty("Team meeting"), None);
    }

    #[test]
    fn test_parse_fixed_duty() {
        let markers = TitleMarkers::default();

        assert_eq!(
            markers.parse_duty("ab onduty fixed"),
            Some(("ab".into(), true))
        );
        assert_eq!(
            markers.parse_duty("[FIXED] cd onduty"),
            Some(("cd".into(), true))
        );
        // Only the whole word counts
        assert_eq!(
            markers.parse_duty("ab onduty unfixedness"),
            Some(("ab".into(), false))
        );
    }

    #[test]
    fn test_parse_absence() {
        let markers = TitleMarkers::default();

        assert_eq!(markers.parse_absence("ab - urlaub"), Some("ab".into()));
        assert_eq!(markers.parse_absence("CD away"), Some("cd".into()));
        assert_eq!(markers.parse_absence("ef krank"), Some("ef".into()));
        assert_eq!(markers.parse_absence("ab onduty"), None);
    }

    #[test]
    fn test_custom_words() {
        let markers = TitleMarkers::new("offsite|sick", "pinned").unwrap();

        assert_eq!(markers.parse_absence("ab sick"), Some("ab".into()));
        assert_eq!(markers.parse_absence("ab urlaub"), None);
        assert_eq!(
            markers.parse_duty("ab onduty pinned"),
            Some(("ab".into(), true))
        );
    }

    #[test]
    fn test_duty_title() {
        let markers = TitleMarkers::default();
        let title = TitleMarkers::duty_title("ab");
        assert_eq!(title, "ab onduty");
        assert_eq!(markers.parse_duty(&title), Some(("ab".into(), false)));
    }
}
