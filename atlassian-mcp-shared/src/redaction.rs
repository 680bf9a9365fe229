//! Masking of credentials and personal data in log output

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use tracing::warn;

struct CompiledPattern {
    regex: Regex,
    name: &'static str,
    replacement: &'static str,
}

/// Regex-based filter applied to every formatted log line.
///
/// Patterns run in order, so credentials with an explicit marker are masked
/// before the generic long-string rule can half-match them.
pub struct LogRedactor {
    patterns: Vec<CompiledPattern>,
}

impl LogRedactor {
    pub fn new() -> Self {
        let table: [(&'static str, &'static str, &'static str); 7] = [
            (
                "JWT_TOKEN",
                r"eyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+",
                "[REDACTED]",
            ),
            (
                "AUTH_HEADER",
                r"(?i)\b(bearer|basic)\s+[A-Za-z0-9._~+/=-]{8,}",
                "$1 [REDACTED]",
            ),
            (
                "TOKEN_ASSIGNMENT",
                r#"(?i)\b(api[_-]?key|api[_-]?token|token|password|secret)(["']?\s*[=:]\s*["']?)[^\s"',;]+"#,
                "$1$2[REDACTED]",
            ),
            (
                "EMAIL",
                r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
                "[EMAIL]",
            ),
            (
                "CARD",
                r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
                "[CARD]",
            ),
            ("PHONE", r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b", "[PHONE]"),
            ("API_KEY", r"\b[A-Za-z0-9]{32,}\b", "[API_KEY]"),
        ];

        let patterns = table
            .into_iter()
            .filter_map(|(name, pattern, replacement)| match Regex::new(pattern) {
                Ok(regex) => Some(CompiledPattern {
                    regex,
                    name,
                    replacement,
                }),
                Err(e) => {
                    warn!("Skipping redaction pattern {}: {}", name, e);
                    None
                }
            })
            .collect();

        Self { patterns }
    }

    /// Process-wide instance, compiled on first use
    pub fn global() -> &'static LogRedactor {
        static REDACTOR: OnceLock<LogRedactor> = OnceLock::new();
        REDACTOR.get_or_init(LogRedactor::new)
    }

    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(text);
        for pattern in &self.patterns {
            let replaced = match pattern.regex.replace_all(&current, pattern.replacement) {
                Cow::Owned(replaced) => Some(replaced),
                Cow::Borrowed(_) => None,
            };
            if let Some(replaced) = replaced {
                current = Cow::Owned(replaced);
            }
        }
        current
    }

    /// Names of the active patterns, in application order
    pub fn pattern_names(&self) -> Vec<&'static str> {
        self.patterns.iter().map(|p| p.name).collect()
    }
}

impl Default for LogRedactor {
    fn default() -> Self {
        Self::new()
    }
}
