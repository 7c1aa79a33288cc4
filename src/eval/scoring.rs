// src/eval/scoring.rs — Keyword and citation-domain scoring
//
// Pure functions over a response's content and citation list. Both counters
// return a map seeded with every requested key so callers always see the
// full key set, zeros included.

use std::collections::BTreeMap;

use glob::{MatchOptions, Pattern};
use regex::RegexBuilder;
use url::Url;

/// Count case-insensitive, non-overlapping literal occurrences of each
/// keyword in the content. Keywords are escaped before matching, so regex
/// metacharacters ("C++", "2+2") count literally. Substring semantics:
/// "cat" matches inside "category".
pub fn count_keywords(content: &str, keywords: &[String]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for kw in keywords {
        let count = RegexBuilder::new(&regex::escape(kw))
            .case_insensitive(true)
            .build()
            .map(|re| re.find_iter(content).count() as u64)
            .unwrap_or(0);
        counts.insert(kw.clone(), count);
    }
    counts
}

/// Count how many citations' hostnames match each wildcard pattern
/// (shell-style, case-insensitive). A citation increments every pattern it
/// matches; citations with no parseable hostname are skipped.
pub fn count_domains(cites: &[String], domain_wildcards: &[String]) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = domain_wildcards
        .iter()
        .map(|pattern| (pattern.clone(), 0))
        .collect();

    let compiled: Vec<(&String, Option<Pattern>)> = domain_wildcards
        .iter()
        .map(|pattern| (pattern, Pattern::new(pattern).ok()))
        .collect();

    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    for cite in cites {
        let Some(domain) = extract_domain(cite) else {
            continue;
        };
        for (pattern, glob) in &compiled {
            let matched = glob
                .as_ref()
                .map(|p| p.matches_with(&domain, options))
                .unwrap_or(false);
            if matched {
                if let Some(count) = counts.get_mut(*pattern) {
                    *count += 1;
                }
            }
        }
    }

    counts
}

/// Lower-cased hostname of a URI. Scheme-less values are parsed as
/// `https://<value>`; the port, if any, is stripped.
pub fn extract_domain(url: &str) -> Option<String> {
    let candidate = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}
