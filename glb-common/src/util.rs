//! Small string helpers shared by the scanner.

use regex::Regex;
use std::sync::OnceLock;

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Works on character boundaries so multi-byte symbols survive.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            let truncated = &s[..idx];
            format!("{}...", truncated.trim_end())
        }
        None => s.to_string(),
    }
}

fn redaction_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let raw: &[(&str, &str)] = &[
            // Telegram bot URLs embed the token in the path
            (r"bot\d{5,}:[A-Za-z0-9_-]{20,}", "bot***REDACTED***"),
            (r"(?i)(token|secret|bearer)\s*[=:]\s*\S{10,}", "$1=***REDACTED***"),
            (r"(?i)(api[_-]?key|apikey)[=:]\s*\S{20,}", "$1=***REDACTED***"),
        ];
        raw.iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|re| (re, *replacement))
            })
            .collect()
    })
}

/// Redact credentials before text reaches a log line.
pub fn sanitize_for_log(s: &str) -> String {
    let mut result = s.to_string();
    for (re, replacement) in redaction_patterns() {
        result = re.replace_all(&result, *replacement).to_string();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello", 10), "hello");
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        assert_eq!(truncate_with_ellipsis("₹₹₹₹", 2), "₹₹...");
    }

    #[test]
    fn test_sanitize_telegram_url() {
        let raw = "error sending request for url (https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw/sendMessage)";
        let clean = sanitize_for_log(raw);
        assert!(!clean.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw"));
        assert!(clean.contains("bot***REDACTED***/sendMessage"));
    }

    #[test]
    fn test_sanitize_leaves_plain_text() {
        assert_eq!(sanitize_for_log("batch 3 failed"), "batch 3 failed");
    }
}
