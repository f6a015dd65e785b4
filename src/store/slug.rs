use once_cell::sync::Lazy;
use regex::Regex;

pub static SLUG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());

/// Builds a URL slug from a display name.
///
/// Accented Latin letters are folded to their base letter, anything outside
/// `[a-z0-9]`, whitespace and `-` is dropped, whitespace runs become a single
/// `-`, repeated `-` collapse and the ends are trimmed. The result can be empty
/// when the name has no usable characters.
pub fn slugify(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match fold(c) {
            Some(base) => folded.push_str(base),
            None if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' => folded.push(c),
            None if c.is_whitespace() => folded.push(' '),
            None => {}
        }
    }

    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        let c = if c == ' ' { '-' } else { c };
        if c == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(c);
    }

    slug.trim_end_matches('-').to_string()
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

fn fold(c: char) -> Option<&'static str> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'ç' => "c",
        'ñ' => "n",
        'œ' => "oe",
        'æ' => "ae",
        'ß' => "ss",
        _ => return None,
    };
    Some(base)
}
