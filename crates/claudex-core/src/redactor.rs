// crates/claudex-core/src/redactor.rs
//! Layered regex + Shannon-entropy redaction of secrets/PII/high-entropy
//! tokens, and path sanitization (§4.1, component C1).
//!
//! Three sequential layers, each `text -> text`:
//! 1. secret patterns (API keys, tokens, provider-prefixed keys, JWTs)
//! 2. PII patterns (email, phone, SSN-shaped, card numbers, public IPv4)
//! 3. Shannon-entropy scan over long opaque-looking substrings
//!
//! UUIDs are placeheld before the PII pass and restored after, so the
//! digit-group heuristics in the PII layer don't fire on UUID segments.

use regex_lite::Regex;
use std::sync::OnceLock;

fn secret_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r#"(?i)(api[_-]?key|token|secret|password|credential)\s*[:=]\s*[^\s"'`,;]{6,}"#)
                .expect("valid regex"),
            Regex::new(r"\b(sk|pk|ak|rk|ghp|gho|ghu|ghs|ghr)_[A-Za-z0-9]{16,}\b").expect("valid regex"),
            Regex::new(r"\bAKIA[0-9A-Z]{16}\b").expect("valid regex"),
            Regex::new(r"\bey[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b")
                .expect("valid regex"),
        ]
    })
}

fn pii_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            (
                Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex"),
                "[REDACTED-PII]",
            ),
            (
                Regex::new(r"\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b").expect("valid regex"),
                "[REDACTED-PII]",
            ),
            (
                Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid regex"),
                "[REDACTED-PII]",
            ),
            (
                Regex::new(r"\b(?:\d[ -]*?){16}\b").expect("valid regex"),
                "[REDACTED-PII]",
            ),
            (
                Regex::new(r"\b(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)(\.(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)){3}\b")
                    .expect("valid regex"),
                "[REDACTED-PII]",
            ),
        ]
    })
}

fn uuid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b")
            .expect("valid regex")
    })
}

fn entropy_candidate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-z0-9+/=_-]{20,}").expect("valid regex"))
}

const SECRET_REPLACEMENT: &str = "[REDACTED]";
const ENTROPY_REPLACEMENT: &str = "[REDACTED-ENTROPY]";
const ENTROPY_THRESHOLD: f64 = 4.5;
const UUID_PLACEHOLDER_PREFIX: &str = "\u{0}UUID_PLACEHOLDER_";

/// Private IPv4 ranges that must survive the PII pass untouched.
fn is_private_ipv4(candidate: &str) -> bool {
    let octets: Vec<&str> = candidate.split('.').collect();
    if octets.len() != 4 {
        return false;
    }
    let parsed: Option<Vec<u8>> = octets.iter().map(|o| o.parse::<u8>().ok()).collect();
    let Some(parsed) = parsed else { return false };
    matches!(
        (parsed[0], parsed[1]),
        (10, _) | (127, _) | (192, 168) | (172, 16..=31)
    )
}

/// Shannon entropy of a string, in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let mut counts = std::collections::HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_insert(0u32) += 1;
    }
    let len = s.chars().count() as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn looks_like_hex_hash(s: &str) -> bool {
    matches!(s.len(), 32 | 40 | 56 | 64 | 96 | 128) && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn looks_like_path_or_url(s: &str) -> bool {
    s.contains('/') || s.contains('\\') || s.starts_with("http")
}

fn looks_like_identifier(s: &str) -> bool {
    // snake_case / kebab-case / camelCase identifiers: letters dominate, few
    // non-alphanumeric separators, no high digit density.
    let digit_count = s.chars().filter(|c| c.is_ascii_digit()).count();
    (digit_count as f64 / s.len() as f64) < 0.2 && (s.contains('_') || s.contains('-'))
}

fn is_allowlisted_candidate(s: &str) -> bool {
    uuid_pattern().is_match(s) || looks_like_hex_hash(s) || looks_like_path_or_url(s) || looks_like_identifier(s)
}

/// Layer 1: secret-shaped key/token patterns.
fn redact_secrets(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in secret_patterns() {
        out = pattern.replace_all(&out, SECRET_REPLACEMENT).into_owned();
    }
    out
}

/// Layer 2: PII patterns, with UUIDs placeheld across the pass.
fn redact_pii(text: &str) -> String {
    let mut uuids = Vec::new();
    let placeheld = uuid_pattern().replace_all(text, |caps: &regex_lite::Captures| {
        let idx = uuids.len();
        uuids.push(caps[0].to_string());
        format!("{UUID_PLACEHOLDER_PREFIX}{idx}\u{0}")
    });

    let mut out = placeheld.into_owned();
    for (pattern, replacement) in pii_patterns() {
        out = pattern
            .replace_all(&out, |caps: &regex_lite::Captures| {
                let matched = &caps[0];
                // IPv4 pattern also matches version-like strings; only treat
                // it as PII when all four octets parse and it isn't private.
                if matched.contains('.') && matched.matches('.').count() == 3 && is_private_ipv4(matched) {
                    matched.to_string()
                } else {
                    replacement.to_string()
                }
            })
            .into_owned();
    }

    for (idx, original) in uuids.into_iter().enumerate() {
        out = out.replace(&format!("{UUID_PLACEHOLDER_PREFIX}{idx}\u{0}"), &original);
    }
    out
}

/// Layer 3: Shannon-entropy scan over long opaque-looking substrings.
fn redact_entropy(text: &str) -> String {
    entropy_candidate_pattern()
        .replace_all(text, |caps: &regex_lite::Captures| {
            let candidate = &caps[0];
            if is_allowlisted_candidate(candidate) {
                candidate.to_string()
            } else if shannon_entropy(candidate) >= ENTROPY_THRESHOLD {
                ENTROPY_REPLACEMENT.to_string()
            } else {
                candidate.to_string()
            }
        })
        .into_owned()
}

/// Full three-layer redaction, applied to freshly-extracted observation
/// content (§4.1 "full" entry point).
pub fn redact_sensitive(text: &str) -> String {
    let text = redact_secrets(text);
    let text = redact_pii(&text);
    redact_entropy(&text)
}

/// Assembly-output redaction: identical three layers, run again on the
/// assembled markdown because the store may contain un-redacted legacy rows
/// (§4.1 "assembly-output" entry point). Idempotent by construction: running
/// it on already-redacted text is a no-op, since `[REDACTED...]` markers
/// don't match any of the three layers' patterns.
pub fn redact_assembly_output(text: &str) -> String {
    redact_sensitive(text)
}

/// Sanitize an absolute path for inclusion in persisted/assembled content.
///
/// If `path` is under `project_root`, returns `<project>/REL`. Otherwise,
/// OS user-home segments are redacted to `[USER]`.
pub fn sanitize_path(path: &str, project_root: Option<(&str, &str)>) -> String {
    if let Some((project_name, root)) = project_root {
        let root = root.trim_end_matches('/').trim_end_matches('\\');
        if let Some(rel) = path.strip_prefix(root) {
            let rel = rel.trim_start_matches(['/', '\\']);
            return format!("{project_name}/{rel}");
        }
    }
    redact_user_home_segments(path)
}

fn redact_user_home_segments(path: &str) -> String {
    static WINDOWS_USER: OnceLock<Regex> = OnceLock::new();
    static UNIX_USER: OnceLock<Regex> = OnceLock::new();

    let windows = WINDOWS_USER
        .get_or_init(|| Regex::new(r"(?i)[A-Za-z]:\\Users\\[^\\]+").expect("valid regex"));
    let unix =
        UNIX_USER.get_or_init(|| Regex::new(r"/(?:home|Users)/[^/]+").expect("valid regex"));

    let out = windows.replace_all(path, "[USER]");
    unix.replace_all(&out, "[USER]").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_api_key_assignment() {
        let out = redact_sensitive("api_key = sk-abc123def456ghijk");
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn redacts_ssn_keeps_uuid() {
        let input = "ssn 555-12-3456 and uuid 550e8400-e29b-41d4-a716-446655440000";
        let out = redact_sensitive(input);
        assert!(out.contains("[REDACTED-PII]"));
        assert!(out.contains("550e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn preserves_private_ipv4() {
        let out = redact_sensitive("server at 10.0.0.5 and 192.168.1.1");
        assert!(out.contains("10.0.0.5"));
        assert!(out.contains("192.168.1.1"));
    }

    #[test]
    fn redacts_public_ipv4() {
        let out = redact_sensitive("server at 8.8.8.8");
        assert!(out.contains("[REDACTED-PII]"));
        assert!(!out.contains("8.8.8.8"));
    }

    #[test]
    fn entropy_layer_catches_high_entropy_token_but_not_path() {
        let high_entropy = "aK9x2Qp7Lm3Zv8Rt1Yn4Wj6Hb5Fd0Sc=aK9x2Qp7Lm3Zv8Rt";
        let out = redact_entropy(high_entropy);
        assert_eq!(out, ENTROPY_REPLACEMENT);

        let path = "/Users/alice/projects/my-long-identifier-name-here";
        let out = redact_entropy(path);
        assert_eq!(out, path);
    }

    #[test]
    fn assembly_output_redaction_is_idempotent() {
        let input = "token: sk-abc123def456ghijk and 555-12-3456";
        let once = redact_assembly_output(input);
        let twice = redact_assembly_output(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn sanitize_path_under_project_root() {
        let out = sanitize_path("/repo/src/main.rs", Some(("my-proj", "/repo")));
        assert_eq!(out, "my-proj/src/main.rs");
    }

    #[test]
    fn sanitize_path_redacts_user_home() {
        let out = sanitize_path("/home/alice/scratch/notes.md", None);
        assert_eq!(out, "[USER]/scratch/notes.md");

        let out = sanitize_path(r"C:\Users\alice\notes.md", None);
        assert_eq!(out, r"[USER]\notes.md");
    }

    #[test]
    fn shannon_entropy_of_repeated_char_is_zero() {
        assert_eq!(shannon_entropy("aaaaaaaa"), 0.0);
    }
}
