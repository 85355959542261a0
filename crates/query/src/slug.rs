//! Keyword to URL-slug normalisation.
//!
//! The matching engine tests URLs by literal substring containment, and a
//! publisher may write a keyword into its paths either percent-encoded or
//! accent-folded and hyphenated. Every keyword therefore yields both forms.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::merge::merge_list;

/// Characters left unescaped when quoting a path component.
const PATH_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

const ACCENT_FOLDS: [(char, char); 20] = [
    ('ä', 'a'),
    ('â', 'a'),
    ('á', 'a'),
    ('à', 'a'),
    ('ã', 'a'),
    ('ç', 'c'),
    ('è', 'e'),
    ('é', 'e'),
    ('ê', 'e'),
    ('ë', 'e'),
    ('í', 'i'),
    ('ï', 'i'),
    ('ò', 'o'),
    ('ó', 'o'),
    ('õ', 'o'),
    ('ô', 'o'),
    ('ñ', 'n'),
    ('ù', 'u'),
    ('ú', 'u'),
    ('ü', 'u'),
];

/// Turn free-text keywords into sorted, deduplicated slug tokens.
///
/// Empty keywords and keywords starting with `/` (already paths) are
/// skipped.
pub fn slugify_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<String> {
    let mut tokens = Vec::with_capacity(keywords.len() * 2);
    for keyword in keywords.iter().map(AsRef::as_ref) {
        if keyword.is_empty() || keyword.starts_with('/') {
            continue;
        }
        let base = keyword.trim().to_lowercase().replace("  ", " ");
        if base.is_empty() {
            continue;
        }

        let raw = hyphenate(quote(&base));
        let folded = hyphenate(quote(&fold_accents(&base.replace(' ', "-"))));
        tracing::debug!(keyword, raw = %raw, folded = %folded, "Slugified keyword");
        tokens.push(raw);
        tokens.push(folded);
    }
    merge_list(&tokens, &[])
}

fn quote(text: &str) -> String {
    utf8_percent_encode(text, PATH_COMPONENT).to_string()
}

fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| {
            ACCENT_FOLDS
                .iter()
                .find(|(accented, _)| *accented == c)
                .map_or(c, |(_, ascii)| *ascii)
        })
        .collect()
}

/// Ensure a token starts and ends with `-`.
fn hyphenate(token: String) -> String {
    let mut slug = token;
    if !slug.starts_with('-') {
        slug.insert(0, '-');
    }
    if !slug.ends_with('-') {
        slug.push('-');
    }
    slug
}
