use once_cell::sync::Lazy;
use regex::Regex;

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2,4}-\d{3,4}-\d{4}\b").expect("phone regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});

/// Prepares a raw transcript before it is sent to the model backend.
///
/// Truncates to `max_chars` characters, then replaces phone-number-like and
/// email-like substrings with fixed placeholder tokens so PII never leaves
/// the machine.
pub fn sanitize_transcript(text: &str, max_chars: usize) -> String {
    let truncated = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    };
    let redacted = PHONE_RE.replace_all(truncated, "[PHONE]");
    EMAIL_RE.replace_all(&redacted, "[EMAIL]").into_owned()
}
