//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve a `${VAR_NAME}` reference from the environment.
///
/// Values that are not a reference are returned unchanged.
pub fn resolve_env(value: &str) -> Result<String> {
    let Some(rest) = value.strip_prefix("${") else {
        return Ok(value.to_string());
    };
    let var_name = rest
        .strip_suffix('}')
        .ok_or_else(|| AppError::config(format!("Malformed env var reference: {value}")))?;
    std::env::var(var_name)
        .map_err(|_| AppError::config(format!("Environment variable '{var_name}' is not set")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  VW \n Golf\t 1.6 "), "VW Golf 1.6");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_resolve_env_literal() {
        assert_eq!(resolve_env("plain-token").unwrap(), "plain-token");
    }

    #[test]
    fn test_resolve_env_missing() {
        let err = resolve_env("${NEWS_CRAWLER_SURELY_UNSET_VAR}").unwrap_err();
        assert!(err.to_string().contains("NEWS_CRAWLER_SURELY_UNSET_VAR"));
    }

    #[test]
    fn test_resolve_env_malformed() {
        assert!(resolve_env("${BROKEN").is_err());
    }

    #[test]
    fn test_resolve_env_present() {
        let value = resolve_env("${PATH}").unwrap();
        assert_eq!(value, std::env::var("PATH").unwrap());
    }
}
