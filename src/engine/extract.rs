// src/engine/extract.rs — Citation extraction helpers shared by adapters
//
// Provider schemas drift across API versions and some response shapes drop
// citation metadata entirely. Every adapter therefore unions two tiers:
// (a) the structured citation fields it knows about, and (b) a walk over the
// whole serialized payload collecting anything that looks like an absolute
// URI. Tier (b) is the safety net.

use url::Url;

/// Collect every string in the payload that parses as an absolute URI
/// (scheme and host both present), in document order.
pub fn collect_urls(value: &serde_json::Value) -> Vec<String> {
    let mut urls = Vec::new();
    walk(value, &mut urls);
    urls
}

fn walk(value: &serde_json::Value, urls: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => {
            if is_absolute_url(s) {
                urls.push(s.clone());
            }
        }
        serde_json::Value::Object(map) => {
            for nested in map.values() {
                walk(nested, urls);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                walk(item, urls);
            }
        }
        _ => {}
    }
}

/// True when the string is a URI with both a scheme and a host.
/// Scheme-less values ("example.com") and host-less ones ("mailto:a@b")
/// don't count.
pub fn is_absolute_url(s: &str) -> bool {
    Url::parse(s).map(|u| u.has_host()).unwrap_or(false)
}

/// Deduplicate preserving first-seen order.
pub fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::with_capacity(items.len());
    for item in items {
        if seen.insert(item.clone()) {
            ordered.push(item);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_collect_urls_nested() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "see https://docs.example.com/page for details" },
                        { "uri": "https://wiki.example.com/math" }
                    ]
                }
            }],
            "meta": { "source": "https://wiki.example.com/math" }
        });
        let urls = collect_urls(&payload);
        // Strings embedded inside prose are not URIs on their own.
        assert_eq!(
            urls,
            vec![
                "https://wiki.example.com/math".to_string(),
                "https://wiki.example.com/math".to_string(),
            ]
        );
    }

    #[test]
    fn test_collect_urls_skips_non_urls() {
        let payload = json!({
            "a": "plain text",
            "b": "example.com",
            "c": "mailto:someone@example.com",
            "d": 42,
            "e": null,
            "f": true,
        });
        assert!(collect_urls(&payload).is_empty());
    }

    #[test]
    fn test_is_absolute_url() {
        assert!(is_absolute_url("https://example.com/a"));
        assert!(is_absolute_url("http://example.com"));
        assert!(!is_absolute_url("example.com/a"));
        assert!(!is_absolute_url("/relative/path"));
        assert!(!is_absolute_url("mailto:a@b.com"));
    }

    #[test]
    fn test_dedupe_preserves_first_seen_order() {
        let urls = vec![
            "https://b.com/".to_string(),
            "https://a.com/".to_string(),
            "https://b.com/".to_string(),
            "https://c.com/".to_string(),
            "https://a.com/".to_string(),
        ];
        assert_eq!(
            dedupe(urls),
            vec![
                "https://b.com/".to_string(),
                "https://a.com/".to_string(),
                "https://c.com/".to_string(),
            ]
        );
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe(vec![]).is_empty());
    }
}
