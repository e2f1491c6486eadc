/// Mention redaction applied to generated text before it is sent.
use regex::{Captures, Regex};
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

use crate::schema::ids::UserId;

static USER_MENTION: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

fn user_mention() -> &'static Regex {
    USER_MENTION.get_or_init(|| Regex::new(r"<@!?(?P<id>\d+)>").expect("valid mention regex"))
}

fn whitespace_run() -> &'static Regex {
    WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"))
}

/// Blank `<@id>` and `<@!id>` mentions of users in `disabled`.
///
/// Whitespace runs left behind collapse to a single space and the result is
/// trimmed. Text is returned unchanged when either input is empty.
pub fn redact_mentions(text: &str, disabled: &FxHashSet<UserId>) -> String {
    if text.is_empty() || disabled.is_empty() {
        return text.to_string();
    }

    let redacted = user_mention().replace_all(text, |caps: &Captures<'_>| {
        let blocked = caps["id"]
            .parse::<u64>()
            .map(|id| disabled.contains(&UserId(id)))
            .unwrap_or(false);
        if blocked {
            String::new()
        } else {
            caps[0].to_string()
        }
    });

    whitespace_run().replace_all(&redacted, " ").trim().to_string()
}
