//! Domain and relative-reference helpers for URLs.

use reqwest::Url;

/// Extracts the hostname from a URL, or the input itself when it does not parse.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Resolves `raw` against `base` (when given) and requires an absolute URL
/// with both a scheme and a host.
///
/// Protocol-relative references (`//cdn.example.com/x.png`) without a base
/// are treated as `https`.
///
/// # Errors
///
/// Returns a human-readable reason when the reference cannot be resolved.
pub fn resolve_url(raw: &str, base: Option<&str>) -> Result<Url, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty URL".to_owned());
    }

    let parsed = match base {
        Some(base) => Url::parse(base)
            .and_then(|b| b.join(raw))
            .map_err(|e| format!("cannot resolve '{raw}' against '{base}': {e}"))?,
        None if raw.starts_with("//") => Url::parse(&format!("https:{raw}"))
            .map_err(|e| format!("invalid protocol-relative URL '{raw}': {e}"))?,
        None => Url::parse(raw).map_err(|e| format!("invalid URL '{raw}': {e}"))?,
    };

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(format!("URL '{raw}' has no host"));
    }
    Ok(parsed)
}
