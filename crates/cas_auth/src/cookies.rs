use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest::Url;

/// Single-host cookie jar keyed by cookie name only.
///
/// The gateway lives on one host, so domain and path scoping are ignored;
/// every stored cookie is sent with every request made through the jar.
#[derive(Debug, Default)]
pub struct FlatCookieJar {
    cookies: RwLock<BTreeMap<String, String>>,
}

impl FlatCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.read().clone()
    }

    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write().insert(name.into(), value.into());
    }

    /// Applies one `Set-Cookie` header value.
    pub fn apply_set_cookie(&self, header: &str) {
        let Some((name, value, expired)) = parse_set_cookie(header) else {
            return;
        };
        let mut cookies = self.write();
        if expired {
            cookies.remove(&name);
        } else {
            cookies.insert(name, value);
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        match self.cookies.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        match self.cookies.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CookieStore for FlatCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        for header in cookie_headers {
            if let Ok(header) = header.to_str() {
                self.apply_set_cookie(header);
            }
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        let cookies = self.read();
        if cookies.is_empty() {
            return None;
        }
        let joined = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }
}

fn parse_set_cookie(header: &str) -> Option<(String, String, bool)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let expired = parts.any(|attribute| {
        let attribute = attribute.trim();
        attribute
            .split_once('=')
            .is_some_and(|(key, value)| key.trim().eq_ignore_ascii_case("max-age") && value.trim() == "0")
    });

    Some((name.to_string(), value.trim().trim_matches('"').to_string(), expired))
}
