use std::sync::OnceLock;

use regex::Regex;

/// Hidden tokens the CAS login form requires on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTokens {
    pub lt: String,
    pub execution: String,
}

/// Pulls [`FormTokens`] out of a login page.
///
/// Swap the implementation to support a different login page layout.
pub trait FormTokenExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Option<FormTokens>;
}

/// Matches `name="lt" value="..."` and `name="execution" value="..."`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexFormTokenExtractor;

fn lt_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r#"name="lt"\s+value="([^"]+)""#).expect("lt regex must compile")
    })
}

fn execution_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r#"name="execution"\s+value="([^"]+)""#).expect("execution regex must compile")
    })
}

impl FormTokenExtractor for RegexFormTokenExtractor {
    fn extract(&self, html: &str) -> Option<FormTokens> {
        let lt = lt_regex().captures(html)?.get(1)?.as_str().to_owned();
        let execution = execution_regex().captures(html)?.get(1)?.as_str().to_owned();
        Some(FormTokens { lt, execution })
    }
}
