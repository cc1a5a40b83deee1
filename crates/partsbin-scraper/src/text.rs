//! Text cleanup shared by API extraction and HTML scraping, so specs from
//! either source end up with the same shape.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").expect("valid script regex")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid entity regex")
});

const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Collapses whitespace runs to single spaces, trims, and drops zero-width characters.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace())
        .map(|word| word.replace(ZERO_WIDTH, ""))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes a specification or column name into a stable key.
///
/// Lower-cases, collapses every run of non-alphanumeric ASCII into one `-`,
/// and trims leading and trailing hyphens: `"Package / Case"` becomes
/// `"package-case"` and `"Resistance (Ω)"` becomes `"resistance"`.
/// Thousands separators inside numbers are dropped, so `"1,000+"` becomes `"1000"`.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_sep = false;
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('-');
            }
            pending_sep = false;
            key.push(c.to_ascii_lowercase());
        } else if c == ','
            && !pending_sep
            && key.ends_with(|p: char| p.is_ascii_digit())
            && chars.peek().is_some_and(char::is_ascii_digit)
        {
            continue;
        } else {
            pending_sep = true;
        }
    }
    key
}

/// Removes tags (and script/style bodies) and decodes entities.
#[must_use]
pub fn strip_html(raw: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(raw, " ");
    let without_tags = TAG_RE.replace_all(&without_scripts, " ");
    decode_entities(&without_tags)
}

/// Decodes named, decimal, and hex character references. Unknown names are kept verbatim.
#[must_use]
pub fn decode_entities(raw: &str) -> String {
    ENTITY_RE
        .replace_all(raw, |caps: &Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            decoded.map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "deg" => '°',
        "plusmn" => '±',
        "micro" => '\u{b5}',
        "Omega" => '\u{3a9}',
        "reg" => '®',
        "copy" => '©',
        "trade" => '™',
        "ndash" => '–',
        "mdash" => '—',
        _ => return None,
    })
}

/// Truncates to at most `max_len` characters on a word boundary, appending `...`.
///
/// Text already within the limit is returned unchanged.
#[must_use]
pub fn truncate_words(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_owned();
    }
    let budget = max_len.saturating_sub(3);
    let head: String = text.chars().take(budget).collect();
    let next_is_boundary = text.chars().nth(budget).is_some_and(char::is_whitespace);
    let cut = if next_is_boundary {
        head.as_str()
    } else {
        head.rfind(char::is_whitespace)
            .map_or(head.as_str(), |idx| &head[..idx])
    };
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace_and_zero_width() {
        assert_eq!(
            clean_text("  10k\u{200B}Ω \n\t 1%  resistor\u{FEFF} "),
            "10kΩ 1% resistor"
        );
        assert_eq!(clean_text("\u{00A0}a\u{00A0}\u{00A0}b"), "a b");
        assert_eq!(clean_text("   "), "");
    }

    #[test]
    fn normalize_key_collapses_non_alnum_runs() {
        assert_eq!(normalize_key("Resistance (Ω)"), "resistance");
        assert_eq!(normalize_key("resistance___ohms"), "resistance-ohms");
        assert_eq!(normalize_key("  Package / Case "), "package-case");
        assert_eq!(normalize_key("--Operating Temp--"), "operating-temp");
        assert_eq!(normalize_key("LCSC Part Number"), "lcsc-part-number");
        assert_eq!(normalize_key("Ω"), "");
    }

    #[test]
    fn normalize_key_drops_thousands_separators() {
        assert_eq!(normalize_key("1,000+"), "1000");
        assert_eq!(normalize_key("10,000 - 24,999"), "10000-24999");
        assert_eq!(normalize_key("Sizes 4, 6"), "sizes-4-6");
        assert_eq!(normalize_key("M3,M4"), "m3-m4");
    }

    #[test]
    fn strip_html_removes_tags_scripts_and_entities() {
        let html = "<p>Tiny&nbsp;<b>MCU</b> &amp; more</p><script>var x = '<b>';</script>";
        assert_eq!(clean_text(&strip_html(html)), "Tiny MCU & more");
    }

    #[test]
    fn decode_entities_handles_numeric_forms() {
        assert_eq!(
            decode_entities("10&#181;F &#x3A9; &foo;"),
            "10\u{b5}F \u{3a9} &foo;"
        );
    }

    #[test]
    fn truncate_words_cuts_on_word_boundary() {
        let text = "Low noise operational amplifier with rail to rail output";
        let cut = truncate_words(text, 24);
        assert_eq!(cut, "Low noise operational...");
        assert!(cut.chars().count() <= 24);
    }

    #[test]
    fn truncate_words_keeps_short_text() {
        assert_eq!(truncate_words("short", 10), "short");
    }

    #[test]
    fn truncate_words_without_spaces_hard_cuts() {
        assert_eq!(truncate_words("abcdefghijkl", 8), "abcde...");
    }
}
