/// Default base URL of the campus model gateway.
pub const DEFAULT_API_BASE: &str = "https://deepseek.nwafu.edu.cn/api";

pub const CAS_LOGIN_PATH: &str = "cas/login";
pub const AUTH_LOGIN_PATH: &str = "auth/login";
pub const MODELS_PATH: &str = "models";
pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";

/// Trim the base URL and drop trailing slashes, falling back to the default.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_API_BASE
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

/// Join `path` onto the normalized base URL.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        path.trim_start_matches('/')
    )
}
