/// Sentence splitting, word splitting, and key cleaning for chat text.
use regex::Regex;
use std::sync::OnceLock;

/// Characters that end a sentence. Runs of them count as one boundary.
const SENTENCE_ENDERS: &[char] = &['.', '!', '?'];

/// Edge characters stripped from a token before it becomes part of a key.
const KEY_EDGE_PUNCTUATION: &[char] = &['<', '>', '(', ')', '[', ']', '{', '}', ':', ';', ',', '.', '"'];

static CUSTOM_EMOJI: OnceLock<Regex> = OnceLock::new();

fn custom_emoji() -> &'static Regex {
    CUSTOM_EMOJI
        .get_or_init(|| Regex::new(r"^<a?:[A-Za-z0-9_~]+:\d+>$").expect("valid custom emoji regex"))
}

/// True for letters, digits (any script) and underscore.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True if `token` is a platform custom emoji such as `<:wave:123>` or `<a:spin:456>`.
pub fn is_custom_emoji(token: &str) -> bool {
    custom_emoji().is_match(token)
}

/// Split text into trimmed, non-empty sentence fragments.
pub fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(SENTENCE_ENDERS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Split a sentence into raw tokens on whitespace runs.
pub fn split_tokens(sentence: &str) -> Vec<&str> {
    sentence.split_whitespace().collect()
}

/// Normalize a raw token for use in a key.
///
/// Custom emoji pass through untouched. Tokens with at least one word
/// character lose leading and trailing bracket/quote/colon/semicolon/comma/
/// period runs; inner punctuation such as apostrophes stays. Pure symbol
/// tokens are kept as they are.
pub fn clean_token(token: &str) -> &str {
    let token = token.trim();
    if token.is_empty() || is_custom_emoji(token) {
        return token;
    }
    if token.chars().any(is_word_char) {
        token.trim_matches(KEY_EDGE_PUNCTUATION)
    } else {
        token
    }
}

/// Build the lookup key for a token pair, or `None` if either side cleans to nothing.
pub fn make_key(first: &str, second: &str) -> Option<String> {
    let first = clean_token(first);
    let second = clean_token(second);
    if first.is_empty() || second.is_empty() {
        return None;
    }
    Some(format!("{} {}", first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_split_on_terminal_runs() {
        let sentences: Vec<&str> = split_sentences("wow!!! is that real?? yes. ok").collect();
        assert_eq!(sentences, vec!["wow", "is that real", "yes", "ok"]);
    }

    #[test]
    fn sentences_skip_empty_fragments() {
        assert_eq!(split_sentences("...!?  ").count(), 0);
    }

    #[test]
    fn tokens_split_on_whitespace_runs() {
        assert_eq!(split_tokens("  one\ttwo   three \n"), vec!["one", "two", "three"]);
    }

    #[test]
    fn clean_strips_edge_punctuation() {
        assert_eq!(clean_token("(hello),"), "hello");
        assert_eq!(clean_token("\"quoted\""), "quoted");
        assert_eq!(clean_token("<b>"), "b");
        assert_eq!(clean_token("end.;:"), "end");
    }

    #[test]
    fn clean_keeps_inner_punctuation() {
        assert_eq!(clean_token("don't"), "don't");
        assert_eq!(clean_token("e.g."), "e.g");
        assert_eq!(clean_token("'tis"), "'tis");
    }

    #[test]
    fn clean_keeps_custom_emoji() {
        assert_eq!(clean_token("<:wave:123456789012345678>"), "<:wave:123456789012345678>");
        assert_eq!(clean_token("<a:spin_2~:42>"), "<a:spin_2~:42>");
    }

    #[test]
    fn clean_keeps_pure_symbols() {
        assert_eq!(clean_token("..."), "...");
        assert_eq!(clean_token("&&"), "&&");
    }

    #[test]
    fn emoji_pattern_is_strict() {
        assert!(is_custom_emoji("<:ok:1>"));
        assert!(!is_custom_emoji("<:ok:abc>"));
        assert!(!is_custom_emoji("<b:ok:1>"));
        assert!(!is_custom_emoji("x<:ok:1>"));
    }

    #[test]
    fn key_joins_cleaned_pair() {
        assert_eq!(make_key("Hello,", "(world)"), Some("Hello world".to_string()));
        assert_eq!(make_key("", "world"), None);
    }
}
