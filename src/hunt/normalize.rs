//! OCR text normalization
//!
//! The hunt panel decorates every hint with a location icon that OCR engines
//! frequently mistake for a `0` or `@`, and the place-name vocabulary is
//! French, so accents and the `œ` ligature come and go depending on how well
//! a capture reads. Everything funnels through here before any lookup.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strip OCR noise and unify punctuation, keeping accents.
///
/// Steps, in fixed order: drop the icon glyphs (`0`, `@`), fold `œ` to `oe`,
/// drop apostrophes, trim. Never fails; empty input yields empty output.
pub fn sanitize(raw: &str) -> String {
    raw.replace(['0', '@'], "")
        .replace('œ', "oe")
        .replace('Œ', "Oe")
        .replace(['\'', '’'], "")
        .trim()
        .to_string()
}

/// Accent-insensitive form of `text`: canonical decomposition, then every
/// combining mark (category Mn) removed. Used only as a matching key; the
/// accent-preserving form stays around for display and index name matching.
pub fn fold_key(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Full normalization for a lookup key: sanitize, then fold accents.
pub fn normalize_key(raw: &str) -> String {
    fold_key(&sanitize(raw))
}
