/// Cleanup pass for generated text.
///
/// Joining raw tokens from different messages leaves half-open brackets,
/// lone quotes and dangling commas. `sanitize` repairs those without
/// touching the words themselves.
use crate::core::tokenize::is_word_char;

const BRACKET_PAIRS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}')];

/// Quote and markdown markers that must appear an even number of times.
const PAIRED_MARKERS: &[char] = &['"', '\'', '`', '*'];

const LEADING_STRAY: &[char] = &['.', ',', ';', ':'];
const TRAILING_STRAY: &[char] = &[','];

/// Balance brackets, then paired markers, then trim stray edge punctuation.
pub fn sanitize(text: &str) -> String {
    let mut text = text.trim().to_string();

    for &(open, close) in BRACKET_PAIRS {
        text = balance_pair(&text, open, close);
    }

    for &marker in PAIRED_MARKERS {
        text = balance_marker(&text, marker);
    }

    trim_edges(&text).to_string()
}

/// Delete offending `open`/`close` characters until the pair is balanced.
///
/// A close with no open before it is dropped. Opens still waiting for a
/// close at the end of the scan are dropped, earliest first. Pairs that
/// already match are never touched.
pub fn balance_pair(text: &str, open: char, close: char) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut offending = vec![false; chars.len()];
    let mut pending: Vec<usize> = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == open {
            pending.push(i);
        } else if c == close && pending.pop().is_none() {
            offending[i] = true;
        }
    }
    for i in pending {
        offending[i] = true;
    }

    chars
        .into_iter()
        .zip(offending)
        .filter_map(|(c, drop)| (!drop).then_some(c))
        .collect()
}

/// Drop the rightmost `marker` if it occurs an odd number of times.
pub fn balance_marker(text: &str, marker: char) -> String {
    if text.matches(marker).count() % 2 == 0 {
        return text.to_string();
    }
    match text.rfind(marker) {
        Some(idx) => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..idx]);
            out.push_str(&text[idx + marker.len_utf8()..]);
            out
        }
        None => text.to_string(),
    }
}

/// Strip leading `. , ; :` and trailing `,` along with surrounding whitespace.
///
/// Trailing periods, semicolons and colons stay: generated text may end a
/// sentence. Text without any word character is only whitespace-trimmed.
fn trim_edges(text: &str) -> &str {
    if !text.chars().any(is_word_char) {
        return text.trim();
    }
    text.trim_start_matches(|c: char| c.is_whitespace() || LEADING_STRAY.contains(&c))
        .trim_end_matches(|c: char| c.is_whitespace() || TRAILING_STRAY.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_balanced(text: &str) {
        for &(open, close) in BRACKET_PAIRS {
            assert_eq!(
                text.matches(open).count(),
                text.matches(close).count(),
                "unbalanced {}{} in {:?}",
                open,
                close,
                text
            );
        }
        for &marker in PAIRED_MARKERS {
            assert_eq!(text.matches(marker).count() % 2, 0, "odd {} in {:?}", marker, text);
        }
    }

    #[test]
    fn removes_stray_close() {
        assert_eq!(balance_pair("a) (b)", '(', ')'), "a (b)");
    }

    #[test]
    fn removes_first_unmatched_open() {
        assert_eq!(balance_pair("((a)", '(', ')'), "(a)");
        assert_eq!(balance_pair("x [y [z", '[', ']'), "x y z");
    }

    #[test]
    fn matched_pairs_survive_unmatched_open() {
        assert_eq!(balance_pair("(a) (b", '(', ')'), "(a) b");
        assert_eq!(balance_pair("(a)(", '(', ')'), "(a)");
        assert_eq!(balance_pair("(x (y) z", '(', ')'), "x (y) z");
        assert_eq!(sanitize("(so) (maybe [this] works"), "(so) maybe [this] works");
    }

    #[test]
    fn close_before_open_both_removed() {
        assert_eq!(balance_pair("}a{", '{', '}'), "a");
    }

    #[test]
    fn odd_marker_loses_last_occurrence() {
        assert_eq!(balance_marker("\"hi\" \"there", '"'), "\"hi\" there");
        assert_eq!(balance_marker("**bold** *x", '*'), "**bold** x");
        assert_eq!(balance_marker("`ok`", '`'), "`ok`");
    }

    #[test]
    fn edge_trim_is_asymmetric() {
        assert_eq!(sanitize(", ; hello there,"), "hello there");
        assert_eq!(sanitize("hello there."), "hello there.");
        assert_eq!(sanitize("hello there:"), "hello there:");
    }

    #[test]
    fn symbol_only_text_keeps_punctuation() {
        assert_eq!(sanitize(" ... "), "...");
        assert_eq!(sanitize(",,"), ",,");
    }

    #[test]
    fn full_pass_repairs_generated_text() {
        let out = sanitize("  ) so \"he said [that (it was* fine,  ");
        assert_eq!(out, "so he said that it was fine");
        assert_balanced(&out);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let samples = [
            "",
            "   ",
            ". \"",
            "\"\ta",
            ".\t.a",
            "((x) ] [y",
            "it's 'quoted",
            ":: wow, `code, *emph,",
            "}}{{ ]][[ ))((",
            "<:wave:1> (hey",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", sample);
            assert_balanced(&once);
        }
    }
}
