//! API key format detection by prefix shape.
//!
//! Patterns are anchored at the start only; trailing characters do not matter.
//! The first matching row wins.

use regex::Regex;
use shroud_domain::ApiKeyFormat;
use std::sync::LazyLock;

static KEY_PATTERNS: LazyLock<Vec<(ApiKeyFormat, Regex)>> = LazyLock::new(|| {
    [
        (ApiKeyFormat::Openai, r"^sk-(proj-)?[A-Za-z0-9]{48,}"),
        (ApiKeyFormat::Anthropic, r"^sk-ant-[A-Za-z0-9-]{95}"),
        (ApiKeyFormat::Google, r"^AIza[A-Za-z0-9_-]{35}"),
        (ApiKeyFormat::Aws, r"^(AKIA|ASIA)[A-Z0-9]{16}"),
        (ApiKeyFormat::Github, r"^gh[ps]_[A-Za-z0-9]{36}"),
        (ApiKeyFormat::Stripe, r"^(sk|pk)_(live|test)_[A-Za-z0-9]{24,}"),
    ]
    .into_iter()
    .map(|(format, pattern)| (format, Regex::new(pattern).expect("Invalid API key regex")))
    .collect()
});

/// Recognizes the provider of a key, falling back to [`ApiKeyFormat::Generic`].
#[must_use]
pub fn detect_key_format(key: &str) -> ApiKeyFormat {
    KEY_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(key))
        .map_or(ApiKeyFormat::Generic, |(format, _)| *format)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(prefix: &str, body: char, len: usize) -> String {
        format!("{prefix}{}", body.to_string().repeat(len))
    }

    #[test]
    fn recognizes_each_provider() {
        assert_eq!(detect_key_format(&key("sk-", 'a', 48)), ApiKeyFormat::Openai);
        assert_eq!(detect_key_format(&key("sk-proj-", 'B', 60)), ApiKeyFormat::Openai);
        assert_eq!(detect_key_format(&key("sk-ant-api03-", 'x', 95)), ApiKeyFormat::Anthropic);
        assert_eq!(detect_key_format(&key("AIza", '_', 35)), ApiKeyFormat::Google);
        assert_eq!(detect_key_format(&key("AKIA", 'Q', 16)), ApiKeyFormat::Aws);
        assert_eq!(detect_key_format(&key("ASIA", '7', 16)), ApiKeyFormat::Aws);
        assert_eq!(detect_key_format(&key("ghp_", 'z', 36)), ApiKeyFormat::Github);
        assert_eq!(detect_key_format(&key("ghs_", '1', 36)), ApiKeyFormat::Github);
        assert_eq!(detect_key_format(&key("sk_live_", 'k', 24)), ApiKeyFormat::Stripe);
        assert_eq!(detect_key_format(&key("pk_test_", 'k', 30)), ApiKeyFormat::Stripe);
    }

    #[test]
    fn short_or_unknown_keys_are_generic() {
        assert_eq!(detect_key_format(&key("sk-", 'a', 47)), ApiKeyFormat::Generic);
        assert_eq!(detect_key_format(&key("AKIA", 'q', 16)), ApiKeyFormat::Generic);
        assert_eq!(detect_key_format("hunter2"), ApiKeyFormat::Generic);
        assert_eq!(detect_key_format(""), ApiKeyFormat::Generic);
    }

    #[test]
    fn only_the_prefix_shape_matters() {
        let openai = format!("{}!!trailing", key("sk-", 'a', 48));
        assert_eq!(detect_key_format(&openai), ApiKeyFormat::Openai);
    }

    #[test]
    fn patterns_are_anchored_at_the_start() {
        assert_eq!(detect_key_format(&key("sk-ant-", 'a', 95)), ApiKeyFormat::Anthropic);
        assert_eq!(detect_key_format(&key("sk-ant-", '-', 95)), ApiKeyFormat::Anthropic);
        assert_eq!(detect_key_format(&format!(" {}", key("sk-", 'a', 48))), ApiKeyFormat::Generic);
    }
}
