//! Query text normalization ahead of keyword matching.

/// Concatenations users commonly type without a space, applied in this order
const SPLIT_PHRASES: [(&str, &str); 3] = [
    ("bodypain", "body pain"),
    ("legpain", "leg pain"),
    ("headache", "head ache"),
];

/// Normalize raw input into the canonical lowercase form used by the keyword tables.
///
/// CamelCase boundaries are split on the original text before lowering, then the
/// text is lowercased and trimmed, then the known concatenations are split.
/// The replacements are plain substring replacements, so "legpaint" becomes
/// "leg paint". Punctuation and unicode forms are left untouched.
pub fn normalize(raw: &str) -> String {
    let mut text = split_camel_case(raw).to_lowercase().trim().to_string();
    for (joined, spaced) in SPLIT_PHRASES {
        text = text.replace(joined, spaced);
    }
    text
}

/// Insert a space at every lowercase-to-uppercase ASCII letter boundary
fn split_camel_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if matches!(prev, Some(p) if p.is_ascii_lowercase()) && c.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }

    out
}
