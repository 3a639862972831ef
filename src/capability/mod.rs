//! Panel access capability.
//!
//! A short-lived, signed cookie proving the current identity recently ran
//! `unlock`. The protected route re-checks it on every visit without a
//! server-side token table.

mod cookie;
mod secret;
mod token;

use thiserror::Error;

pub use cookie::{Cookie, CookieJar, MemoryJar};
pub use secret::{resolver_for, DedicatedSecret, DerivedFallback, SecretResolver, SigningKey};
pub use token::{CapabilityTokenService, Verification, COOKIE_NAME, DEFAULT_TTL};

#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No signing secret could be resolved. A deployment defect.
    #[error("capability configuration error: {0}")]
    Configuration(String),
}
