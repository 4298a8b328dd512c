//! Advisory gate deciding whether a candidate text is worth remembering.

use crate::config::FilterConfig;
use crate::importance;

#[derive(Debug, Clone)]
pub struct MemoryFilter {
    enabled: bool,
    min_text_length: usize,
    max_text_length: usize,
    keywords: Vec<String>,
    min_importance: u8,
}

impl MemoryFilter {
    #[must_use]
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_text_length: config.min_text_length,
            max_text_length: config.max_text_length,
            keywords: config.keywords.clone(),
            min_importance: config.min_importance,
        }
    }

    /// Decide whether `text` should be remembered.
    ///
    /// Deterministic and side-effect free; a disabled filter accepts
    /// everything. Keywords match as raw substrings.
    #[must_use]
    pub fn accept(&self, text: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let chars = text.chars().count();
        if chars < self.min_text_length || chars > self.max_text_length {
            tracing::debug!(chars, "skipping text outside length bounds");
            return false;
        }

        if !self.keywords.is_empty() && !self.keywords.iter().any(|k| text.contains(k.as_str())) {
            tracing::debug!("skipping text without any configured keyword");
            return false;
        }

        if self.min_importance > 0 {
            let score = importance::score(text);
            if score < self.min_importance {
                tracing::debug!(score, "skipping low-importance text");
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(config: FilterConfig) -> MemoryFilter {
        MemoryFilter::new(&config)
    }

    #[test]
    fn accepts_text_within_bounds() {
        let f = filter(FilterConfig::default());
        assert!(f.accept("a perfectly ordinary sentence"));
    }

    #[test]
    fn rejects_too_short_text() {
        let f = filter(FilterConfig::default());
        assert!(!f.accept("short"));
    }

    #[test]
    fn rejects_too_long_text() {
        let f = filter(FilterConfig {
            max_text_length: 20,
            ..FilterConfig::default()
        });
        assert!(!f.accept("this text is longer than twenty characters"));
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        let f = filter(FilterConfig {
            min_text_length: 4,
            ..FilterConfig::default()
        });
        // Four chars, more than four bytes.
        assert!(f.accept("日本語で"));
    }

    #[test]
    fn keyword_allow_list_requires_a_match() {
        let f = filter(FilterConfig {
            keywords: vec!["thermostat".into(), "scene".into()],
            ..FilterConfig::default()
        });
        assert!(f.accept("the thermostat reads twenty degrees"));
        assert!(!f.accept("a sentence about nothing relevant"));
    }

    #[test]
    fn importance_floor_rejects_trivia() {
        let f = filter(FilterConfig {
            min_importance: 3,
            ..FilterConfig::default()
        });
        assert!(f.accept("set the alarm for 7 in the morning"));
        assert!(!f.accept("we chatted about the weather"));
    }

    #[test]
    fn disabled_filter_accepts_everything() {
        let f = filter(FilterConfig {
            enabled: false,
            ..FilterConfig::default()
        });
        assert!(f.accept(""));
        assert!(f.accept("x"));
    }
}
