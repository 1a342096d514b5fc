// locale.rs -- Locale tag extraction from desktop-entry keys

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LOCALE_RE: Regex =
        Regex::new(r"^[A-Za-z]+(_[A-Za-z0-9]+)?(@[A-Za-z0-9]+)?$").unwrap();
}

/// Base name of a desktop-entry key, i.e. the part before any `[locale]`
/// annotation.
pub fn key_base(key: &str) -> &str {
    match key.find('[') {
        Some(pos) => &key[..pos],
        None => key,
    }
}

/// Extract the locale tag from a desktop-entry key.
///
/// A key without a bracketed annotation belongs to the untranslated base
/// locale `"C"`. Encoding suffixes (`.UTF-8`, `.ISO*`) are stripped from the
/// annotation. Returns `None` when the remaining token is not a plausible
/// locale, signalling that the key should be ignored.
pub fn decode(key: &str) -> Option<String> {
    let open = match key.find('[') {
        Some(pos) => pos,
        None => return Some("C".to_string()),
    };

    let mut tag = &key[open + 1..];
    if let Some(stripped) = tag.strip_suffix(']') {
        tag = stripped;
    }

    if tag.to_lowercase().ends_with(".utf-8") {
        tag = &tag[..tag.len() - 6];
    }

    // Legacy encodings like .ISO8859-15 may still be present
    if let Some(dot) = tag.rfind('.') {
        if tag[dot + 1..].to_lowercase().starts_with("iso") {
            tag = &tag[..dot];
        }
    }

    if LOCALE_RE.is_match(tag) {
        Some(tag.to_string())
    } else {
        None
    }
}
