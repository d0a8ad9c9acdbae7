//! Pre-submission content moderation.
//!
//! A static blocklist checked with case-insensitive substring matching
//! against free text and, optionally, an attachment filename. There is no
//! scoring or context awareness: a term embedded in a longer word matches.

use crate::error::{Error, Result};

/// Built-in blocked terms, lowercase.
pub const BLOCKED_TERMS: &[&str] = &[
    "damn", "shit", "fuck", "bitch", "bastard", "asshole", "cunt", "slut", "whore", "porn", "nsfw",
];

/// Outcome of a moderation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationResult {
    /// No blocked term found.
    pub is_clean: bool,
    /// Blocked terms found, each once, in blocklist order.
    pub flagged_terms: Vec<String>,
}

impl ModerationResult {
    fn from_terms(flagged_terms: Vec<String>) -> Self {
        Self {
            is_clean: flagged_terms.is_empty(),
            flagged_terms,
        }
    }

    /// User-facing rejection text, `None` when clean.
    pub fn message(&self) -> Option<String> {
        if self.is_clean {
            None
        } else {
            Some(format!(
                "Your content contains inappropriate language: {}",
                self.flagged_terms.join(", ")
            ))
        }
    }

    /// Convert into a `Result`, failing with `Error::Moderation` when unclean.
    pub fn into_result(self) -> Result<()> {
        if self.is_clean {
            Ok(())
        } else {
            Err(Error::Moderation(self.flagged_terms))
        }
    }
}

/// Blocklist filter with optional extra terms.
#[derive(Debug, Clone)]
pub struct ModerationFilter {
    terms: Vec<String>,
}

impl Default for ModerationFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl ModerationFilter {
    /// Built-in list plus `extra` terms. Blank and duplicate terms are dropped.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<String> = BLOCKED_TERMS.iter().map(|t| t.to_string()).collect();
        for term in extra {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        Self { terms }
    }

    /// The active term list.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Check `text` and, if given, an attachment `filename`.
    pub fn check(&self, text: &str, filename: Option<&str>) -> ModerationResult {
        let text = text.to_lowercase();
        let filename = filename.map(str::to_lowercase);

        let flagged = self
            .terms
            .iter()
            .filter(|term| {
                text.contains(term.as_str())
                    || filename.as_deref().is_some_and(|f| f.contains(term.as_str()))
            })
            .cloned()
            .collect();

        ModerationResult::from_terms(flagged)
    }
}

/// Check content against the built-in blocklist.
pub fn moderate_content(text: &str, filename: Option<&str>) -> ModerationResult {
    ModerationFilter::default().check(text, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_blocked_word() {
        let result = moderate_content("This is a damn test", None);
        assert!(!result.is_clean);
        assert_eq!(result.flagged_terms, vec!["damn".to_string()]);
    }

    #[test]
    fn test_clean_text() {
        let result = moderate_content("Bitcoin will moon", None);
        assert!(result.is_clean);
        assert!(result.flagged_terms.is_empty());
        assert_eq!(result.message(), None);
    }

    #[test]
    fn test_filename_checked() {
        let result = moderate_content("ok", Some("damn-image.jpg"));
        assert!(!result.is_clean);
        assert_eq!(result.flagged_terms, vec!["damn".to_string()]);
    }

    #[test]
    fn test_case_insensitive_and_substring() {
        let result = moderate_content("DAMNED shitcoins", None);
        assert_eq!(
            result.flagged_terms,
            vec!["damn".to_string(), "shit".to_string()]
        );
    }

    #[test]
    fn test_term_reported_once() {
        let result = moderate_content("damn damn", Some("damn.png"));
        assert_eq!(result.flagged_terms, vec!["damn".to_string()]);
    }

    #[test]
    fn test_extra_terms() {
        let filter = ModerationFilter::new(["  RugPull ", "", "damn"]);
        assert_eq!(filter.terms().len(), BLOCKED_TERMS.len() + 1);

        let result = filter.check("another rugpull incoming", None);
        assert_eq!(result.flagged_terms, vec!["rugpull".to_string()]);
        assert!(matches!(result.into_result(), Err(Error::Moderation(_))));
    }

    #[test]
    fn test_message() {
        let result = moderate_content("damn", None);
        assert_eq!(
            result.message().as_deref(),
            Some("Your content contains inappropriate language: damn")
        );
    }
}
