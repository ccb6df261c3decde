//! Text normalization applied to every user-supplied field before it is stored

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());

/// Single-line field: tags and control characters removed, whitespace collapsed.
pub fn text(input: &str) -> String {
    let stripped = TAG_RE.replace_all(input, "");
    let cleaned: String = stripped
        .nfc()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    SPACES_RE.replace_all(cleaned.trim(), " ").into_owned()
}

/// Multi-line field: like [`text`] but line breaks survive.
pub fn textarea(input: &str) -> String {
    let stripped = TAG_RE.replace_all(input, "");
    let cleaned: String = stripped
        .nfc()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect();
    cleaned
        .lines()
        .map(|line| SPACES_RE.replace_all(line.trim(), " ").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub fn email(input: &str) -> String {
    text(input).to_lowercase()
}

/// Optional field; blank values become `None`.
pub fn optional(input: Option<&str>) -> Option<String> {
    input.map(text).filter(|s| !s.is_empty())
}

pub fn optional_textarea(input: Option<&str>) -> Option<String> {
    input.map(textarea).filter(|s| !s.is_empty())
}

/// Escapes text for inclusion in an HTML email body.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
