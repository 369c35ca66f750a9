// SPDX-FileCopyrightText: 2026 Hachi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cleanup and sanity checks for text returned by an LLM tier.

use std::sync::LazyLock;

use regex::Regex;

/// Shortest reply, in characters, that is accepted from a model.
pub const MIN_REPLY_CHARS: usize = 10;

const SPEAKER_TAG: &str = "Hachi:";

static CHECK_MARK_REPLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Hachi:\s*[√✓]").unwrap());

/// Why a model reply was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyDefect {
    #[error("reply is empty or shorter than {MIN_REPLY_CHARS} characters")]
    TooShort,
    #[error("reply is a speaker tag followed by a check mark")]
    CheckMark,
    #[error("reply repeats the speaker tag with little content")]
    RepeatedSpeaker,
}

/// Remove every closed `<think>…</think>` segment and trim the result.
///
/// An unclosed `<think>` is left in place.
pub fn strip_thinking(text: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        match after_open.find(CLOSE) {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &after_open[end + CLOSE.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Reject replies that are too short or are known model artifacts.
pub fn validate_reply(text: &str) -> Result<(), ReplyDefect> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_REPLY_CHARS {
        return Err(ReplyDefect::TooShort);
    }
    if CHECK_MARK_REPLY.is_match(trimmed) {
        return Err(ReplyDefect::CheckMark);
    }
    if trimmed.matches(SPEAKER_TAG).count() > 2 {
        let content = trimmed.replace(SPEAKER_TAG, "");
        let content = content.trim();
        if content.chars().count() < 20 || content.contains(['√', '✓']) {
            return Err(ReplyDefect::RepeatedSpeaker);
        }
    }
    Ok(())
}

/// Strip thinking segments, then validate what is left.
pub fn clean_reply(text: &str) -> Result<String, ReplyDefect> {
    let cleaned = strip_thinking(text);
    validate_reply(&cleaned)?;
    Ok(cleaned)
}
