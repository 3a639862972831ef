// src/capability/cookie.rs — Cookie attributes and the jar seam
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    /// Seconds; `Some(0)` expires the cookie immediately.
    pub max_age: Option<u64>,
}

impl Cookie {
    /// HttpOnly, Path=/ cookie. Every cookie here is SameSite=Strict.
    pub fn strict(name: &str, value: String, secure: bool, max_age: u64) -> Self {
        Self {
            name: name.to_string(),
            value,
            path: "/".to_string(),
            http_only: true,
            secure,
            max_age: Some(max_age),
        }
    }

    /// Expiring overwrite used to delete `name`.
    pub fn removal(name: &str, secure: bool) -> Self {
        Self::strict(name, String::new(), secure, 0)
    }

    /// Value for a `Set-Cookie` header.
    pub fn to_header(&self) -> String {
        let mut out = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", age));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str("; SameSite=Strict");
        out
    }
}

/// Where capability cookies live. An HTTP layer implements this over the
/// request/response pair; `MemoryJar` is the in-process version.
pub trait CookieJar {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, cookie: Cookie);
    /// Expire `name`. `secure` must match the flag the cookie was set with.
    fn remove(&mut self, name: &str, secure: bool);
}

#[derive(Debug, Default)]
pub struct MemoryJar {
    cookies: BTreeMap<String, Cookie>,
    emitted: Vec<String>,
}

impl MemoryJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw value, as if a browser sent it back.
    pub fn insert_raw(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), Cookie::strict(name, value.to_string(), false, 0));
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// `Set-Cookie` headers produced since the last call.
    pub fn take_headers(&mut self) -> Vec<String> {
        std::mem::take(&mut self.emitted)
    }
}

impl CookieJar for MemoryJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).map(|c| c.value.clone())
    }

    fn set(&mut self, cookie: Cookie) {
        self.emitted.push(cookie.to_header());
        if cookie.max_age == Some(0) {
            self.cookies.remove(&cookie.name);
        } else {
            self.cookies.insert(cookie.name.clone(), cookie);
        }
    }

    fn remove(&mut self, name: &str, secure: bool) {
        self.set(Cookie::removal(name, secure));
    }
}
