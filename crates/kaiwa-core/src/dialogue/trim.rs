//! Reply length bounding.

use crate::config::TrimConfig;

/// A reply after bounding its length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trimmed {
    /// Already within bounds.
    Unchanged(String),
    /// Cut after the last sentence end inside the window.
    AtSentence(String),
    /// Hard-cut with the ellipsis appended.
    Truncated(String),
}

impl Trimmed {
    pub fn text(&self) -> &str {
        match self {
            Self::Unchanged(text) | Self::AtSentence(text) | Self::Truncated(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Unchanged(text) | Self::AtSentence(text) | Self::Truncated(text) => text,
        }
    }
}

/// Bounds `text` to `config.max_chars` chars.
///
/// A sentence cut shorter than `min_chars` is not used; the text is
/// hard-cut instead.
pub fn trim_reply(text: &str, config: &TrimConfig, min_chars: usize) -> Trimmed {
    let text = text.trim();
    if text.chars().count() <= config.max_chars {
        return Trimmed::Unchanged(text.to_string());
    }

    let window: String = text.chars().take(config.sentence_window).collect();
    let sentence = window
        .char_indices()
        .filter(|(_, c)| config.sentence_marks.contains(*c))
        .last()
        .map(|(pos, mark)| &window[..pos + mark.len_utf8()]);
    if let Some(sentence) = sentence.filter(|s| s.chars().count() >= min_chars) {
        return Trimmed::AtSentence(sentence.to_string());
    }

    let keep = config
        .max_chars
        .saturating_sub(config.ellipsis.chars().count());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(&config.ellipsis);
    Trimmed::Truncated(cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        let config = TrimConfig::default();
        assert_eq!(
            trim_reply("  Nice!I think so too. ", &config, 2),
            Trimmed::Unchanged("Nice!I think so too.".to_string())
        );
    }

    #[test]
    fn cuts_after_last_sentence_end_in_window() {
        let config = TrimConfig::default();
        let text = format!("{}。{}", "あ".repeat(60), "い".repeat(100));
        let trimmed = trim_reply(&text, &config, 2);
        assert_eq!(trimmed, Trimmed::AtSentence(format!("{}。", "あ".repeat(60))));
    }

    #[test]
    fn sentence_end_beyond_window_is_ignored() {
        let config = TrimConfig::default();
        let text = format!("{}。{}", "あ".repeat(117), "い".repeat(10));
        let trimmed = trim_reply(&text, &config, 2);
        let Trimmed::Truncated(result) = trimmed else {
            panic!("expected a hard cut");
        };
        assert_eq!(result.chars().count(), 120);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn result_never_exceeds_max_chars() {
        let config = TrimConfig::default();
        for len in [119, 120, 121, 200, 500] {
            let text: String = "筋トレ最高".chars().cycle().take(len).collect();
            assert!(trim_reply(&text, &config, 2).text().chars().count() <= config.max_chars);
        }
    }

    #[test]
    fn sentence_cut_below_minimum_falls_back_to_hard_cut() {
        let config = TrimConfig::default();
        let text = format!("!{}", "あ".repeat(200));
        let Trimmed::Truncated(result) = trim_reply(&text, &config, 2) else {
            panic!("expected a hard cut");
        };
        assert_eq!(result.chars().count(), 120);
        assert!(result.starts_with("!あ"));

        assert_eq!(trim_reply(&text, &config, 1), Trimmed::AtSentence("!".to_string()));
    }
}
