//! URL normalization and slug derivation

use url::Url;

/// Name used when no usable slug can be derived from a URL
pub const UNNAMED_SITE: &str = "unnamed_site";

/// Maximum slug length in characters
const MAX_NAME_LEN: usize = 50;

/// Trim a URL and prepend `https://` when it has no explicit http(s) scheme
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Derive a stable, DB-safe slug from a URL.
///
/// `https://www.example.com/blog/` becomes `example-com-blog`. The result
/// only contains ASCII alphanumerics and `-`, is at most 50 characters long,
/// and falls back to [`UNNAMED_SITE`] for empty or unparseable input. This
/// function never fails.
pub fn derive_name(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return UNNAMED_SITE.to_string();
    }

    let parsed = match Url::parse(trimmed) {
        Ok(parsed) if parsed.host_str().is_some() => parsed,
        _ => match Url::parse(&format!("https://{}", trimmed)) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Cannot derive a name from {:?}: {}", url, e);
                return UNNAMED_SITE.to_string();
            }
        },
    };

    let host = parsed.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let path = parsed.path();
    let path = path.strip_suffix('/').unwrap_or(path);

    let name: String = format!("{}{}", host, path)
        .replace(['.', '/'], "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_NAME_LEN)
        .collect();

    if name.is_empty() {
        UNNAMED_SITE.to_string()
    } else {
        name
    }
}

/// Slug for a URL, with a timestamp suffix when nothing usable could be derived
pub fn record_name(url: &str, now: chrono::DateTime<chrono::Utc>) -> String {
    let name = derive_name(url);
    if name == UNNAMED_SITE {
        format!("{}_{}", UNNAMED_SITE, now.timestamp())
    } else {
        name
    }
}
