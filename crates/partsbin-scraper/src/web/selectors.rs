//! CSS selector specs and their extraction from a parsed page.

use std::collections::BTreeMap;

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::text::{clean_text, normalize_key};

/// What to read from the elements a selector matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "attribute")]
pub enum SelectorKind {
    /// Cleaned text of the first match.
    Text,
    /// Label/value pairs from the rows of every match, keyed by normalized label.
    Table,
    /// `src` of the first match, resolved against the page URL.
    Image,
    /// `href` of the first match, resolved against the page URL.
    Link,
    /// A named attribute of the first match.
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub css: String,
    pub kind: SelectorKind,
}

impl SelectorSpec {
    /// Infers the kind from the last compound of the selector: `img` reads
    /// `src`, `a` reads `href`, table-like selectors (`table`, `tbody`, `tr`,
    /// or a class containing `table`) aggregate rows, anything else reads text.
    #[must_use]
    pub fn infer(css: &str) -> Self {
        let last = css
            .rsplit(|c: char| c.is_whitespace() || c == '>' || c == '+' || c == '~')
            .find(|s| !s.is_empty())
            .unwrap_or(css)
            .to_ascii_lowercase();
        let kind = if element_is(&last, "img") {
            SelectorKind::Image
        } else if element_is(&last, "a") {
            SelectorKind::Link
        } else if element_is(&last, "table")
            || element_is(&last, "tbody")
            || element_is(&last, "tr")
            || last.contains("table")
        {
            SelectorKind::Table
        } else {
            SelectorKind::Text
        };
        Self {
            css: css.to_owned(),
            kind,
        }
    }

    #[must_use]
    pub fn text(css: &str) -> Self {
        Self {
            css: css.to_owned(),
            kind: SelectorKind::Text,
        }
    }

    #[must_use]
    pub fn table(css: &str) -> Self {
        Self {
            css: css.to_owned(),
            kind: SelectorKind::Table,
        }
    }

    #[must_use]
    pub fn attribute(css: &str, attribute: &str) -> Self {
        Self {
            css: css.to_owned(),
            kind: SelectorKind::Attribute(attribute.to_owned()),
        }
    }
}

impl From<&str> for SelectorSpec {
    fn from(css: &str) -> Self {
        Self::infer(css)
    }
}

fn element_is(compound: &str, tag: &str) -> bool {
    compound
        .strip_prefix(tag)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '-'))
}

/// Named selectors for one scrape.
pub type SelectorMap = BTreeMap<String, SelectorSpec>;

/// Builds a [`SelectorMap`] from `(name, css)` pairs, inferring each kind.
#[must_use]
pub fn selector_map(pairs: &[(&str, &str)]) -> SelectorMap {
    pairs
        .iter()
        .map(|(name, css)| ((*name).to_owned(), SelectorSpec::infer(css)))
        .collect()
}

/// One extracted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrapedValue {
    Text(String),
    Table(BTreeMap<String, String>),
}

impl ScrapedValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScrapedValue::Text(s) => Some(s),
            ScrapedValue::Table(_) => None,
        }
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ScrapedValue::Table(t) => Some(t),
            ScrapedValue::Text(_) => None,
        }
    }
}

/// Resolves every selector against `html`; selectors that match nothing are
/// skipped with a warning.
pub(crate) fn extract_fields(
    html: &str,
    page_url: &Url,
    selectors: &SelectorMap,
) -> (BTreeMap<String, ScrapedValue>, Vec<String>) {
    let document = Html::parse_document(html);
    let mut fields = BTreeMap::new();
    let mut warnings = Vec::new();

    for (name, spec) in selectors {
        let selector = match Selector::parse(&spec.css) {
            Ok(selector) => selector,
            Err(e) => {
                warnings.push(format!("selector '{name}': invalid CSS selector '{}': {e}", spec.css));
                continue;
            }
        };

        let value = match &spec.kind {
            SelectorKind::Text => document
                .select(&selector)
                .map(|el| element_text(&el))
                .find(|t| !t.is_empty())
                .map(ScrapedValue::Text),
            SelectorKind::Table => {
                let table = collect_table(document.select(&selector));
                (!table.is_empty()).then_some(ScrapedValue::Table(table))
            }
            SelectorKind::Image => first_url(&document, &selector, &["src", "data-src"], page_url),
            SelectorKind::Link => first_url(&document, &selector, &["href"], page_url),
            SelectorKind::Attribute(attr) => document
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .map(clean_text)
                .find(|t| !t.is_empty())
                .map(ScrapedValue::Text),
        };

        match value {
            Some(value) => {
                fields.insert(name.clone(), value);
            }
            None => warnings.push(format!("selector '{name}': no match for '{}'", spec.css)),
        }
    }

    (fields, warnings)
}

/// Whether `css` matches anything in `html`; invalid selectors count as absent.
pub(crate) fn has_match(html: &str, css: &str) -> bool {
    Selector::parse(css).is_ok_and(|selector| Html::parse_document(html).select(&selector).next().is_some())
}

fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn first_url(
    document: &Html,
    selector: &Selector,
    attrs: &[&str],
    page_url: &Url,
) -> Option<ScrapedValue> {
    document
        .select(selector)
        .flat_map(|el| attrs.iter().filter_map(move |attr| el.value().attr(attr)))
        .find_map(|raw| page_url.join(raw.trim()).ok())
        .map(|url| ScrapedValue::Text(url.to_string()))
}

fn collect_table<'a>(matches: impl Iterator<Item = ElementRef<'a>>) -> BTreeMap<String, String> {
    static ROW: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));
    static CELL: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("th, td").expect("valid cell selector"));

    let mut table = BTreeMap::new();
    for element in matches {
        let rows: Vec<ElementRef<'a>> = if element.value().name() == "tr" {
            vec![element]
        } else {
            element.select(&ROW).collect()
        };
        for row in rows {
            let cells: Vec<String> = row.select(&CELL).map(|c| element_text(&c)).collect();
            let [label, value, ..] = cells.as_slice() else {
                continue;
            };
            let key = normalize_key(label);
            if !key.is_empty() && !value.is_empty() {
                table.insert(key, value.clone());
            }
        }
    }
    table
}
