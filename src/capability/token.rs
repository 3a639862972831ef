// src/capability/token.rs — Panel access capability tokens
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
//
// Token: `<subject>:<issued_ms>:<hex hmac-sha256(secret, "<subject>:<issued_ms>")>`
// Self-verifying, so no server-side table; expiry is enforced both by the
// cookie Max-Age and by the embedded timestamp.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info};

use super::cookie::{Cookie, CookieJar};
use super::secret::{SecretResolver, SigningKey};
use super::CapabilityError;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "panel_access_token";
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid { subject_id: String },
    /// Deliberately carries no reason.
    Invalid,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid { .. })
    }
}

pub struct CapabilityTokenService {
    resolver: Box<dyn SecretResolver>,
    cookie_name: String,
    ttl: Duration,
    secure: bool,
}

impl CapabilityTokenService {
    pub fn new(resolver: Box<dyn SecretResolver>) -> Self {
        Self {
            resolver,
            cookie_name: COOKIE_NAME.to_string(),
            ttl: DEFAULT_TTL,
            secure: false,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cookie_name(mut self, name: &str) -> Self {
        self.cookie_name = name.to_string();
        self
    }

    /// Mark cookies `Secure` (production).
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn mint(&self, jar: &mut dyn CookieJar, subject_id: &str) -> Result<String, CapabilityError> {
        self.mint_at(jar, subject_id, now_ms())
    }

    /// Sign a token issued at `issued_ms` and store it in the jar.
    pub fn mint_at(
        &self,
        jar: &mut dyn CookieJar,
        subject_id: &str,
        issued_ms: i64,
    ) -> Result<String, CapabilityError> {
        let key = self.resolver.resolve()?;
        let payload = format!("{}:{}", subject_id, issued_ms);
        let signature = hex::encode(sign(&key, &payload));
        let token = format!("{}:{}", payload, signature);

        jar.set(Cookie::strict(&self.cookie_name, token.clone(), self.secure, self.ttl.as_secs()));
        info!(subject = %subject_id, ttl_secs = self.ttl.as_secs(), "panel capability minted");
        Ok(token)
    }

    pub fn verify(&self, jar: &mut dyn CookieJar, current_subject_id: &str) -> Verification {
        self.verify_at(jar, current_subject_id, now_ms())
    }

    /// Checks, in order: shape, subject, age (deleting expired cookies),
    /// then the signature in constant time.
    pub fn verify_at(&self, jar: &mut dyn CookieJar, current_subject_id: &str, now_ms: i64) -> Verification {
        let Some(raw) = jar.get(&self.cookie_name) else {
            return Verification::Invalid;
        };
        let fields: Vec<&str> = raw.split(':').collect();
        let [subject, issued, signature] = fields[..] else {
            debug!("capability cookie malformed");
            return Verification::Invalid;
        };

        if subject != current_subject_id {
            debug!("capability cookie subject mismatch");
            return Verification::Invalid;
        }

        let Ok(issued_ms) = issued.parse::<i64>() else {
            return Verification::Invalid;
        };
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if now_ms.saturating_sub(issued_ms) > ttl_ms {
            jar.remove(&self.cookie_name, self.secure);
            debug!(subject = %subject, "capability cookie expired; removed");
            return Verification::Invalid;
        }

        let key = match self.resolver.resolve() {
            Ok(key) => key,
            Err(err) => {
                error!(error = %err, "cannot verify panel capability");
                return Verification::Invalid;
            }
        };
        let Ok(presented) = hex::decode(signature) else {
            return Verification::Invalid;
        };
        let expected = sign(&key, &format!("{}:{}", subject, issued));
        if bool::from(expected.ct_eq(&presented)) {
            Verification::Valid { subject_id: subject.to_string() }
        } else {
            debug!("capability cookie signature mismatch");
            Verification::Invalid
        }
    }

    pub fn revoke(&self, jar: &mut dyn CookieJar) {
        jar.remove(&self.cookie_name, self.secure);
        info!("panel capability revoked");
    }
}

fn sign(key: &SigningKey, payload: &str) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(payload.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{DedicatedSecret, MemoryJar};

    const T0: i64 = 1_760_000_000_000;

    fn service() -> CapabilityTokenService {
        CapabilityTokenService::new(Box::new(DedicatedSecret::new(Some("test-panel-secret".into()))))
    }

    #[test]
    fn mint_then_verify_within_ttl() {
        let svc = service();
        let mut jar = MemoryJar::new();
        let token = svc.mint_at(&mut jar, "player-7", T0).unwrap();
        assert!(token.starts_with(&format!("player-7:{}:", T0)));
        assert_eq!(token.split(':').nth(2).unwrap().len(), 64);

        let v = svc.verify_at(&mut jar, "player-7", T0 + 300_000);
        assert_eq!(v, Verification::Valid { subject_id: "player-7".into() });
    }

    #[test]
    fn cookie_attributes() {
        let svc = service().secure(true);
        let mut jar = MemoryJar::new();
        svc.mint_at(&mut jar, "p", T0).unwrap();
        let c = jar.cookie(COOKIE_NAME).unwrap();
        assert!(c.http_only && c.secure);
        assert_eq!(c.max_age, Some(300));
        assert_eq!(c.path, "/");
    }

    #[test]
    fn expired_token_is_invalid_and_removed() {
        let svc = service();
        let mut jar = MemoryJar::new();
        svc.mint_at(&mut jar, "player-7", T0).unwrap();
        assert_eq!(svc.verify_at(&mut jar, "player-7", T0 + 300_001), Verification::Invalid);
        assert!(jar.get(COOKIE_NAME).is_none());
    }

    #[test]
    fn other_subject_cannot_replay() {
        let svc = service();
        let mut jar = MemoryJar::new();
        svc.mint_at(&mut jar, "alice", T0).unwrap();
        assert_eq!(svc.verify_at(&mut jar, "mallory", T0 + 1), Verification::Invalid);
        // a mismatch leaves the cookie for its owner
        assert!(svc.verify_at(&mut jar, "alice", T0 + 1).is_valid());
    }

    #[test]
    fn any_flipped_signature_digit_is_rejected() {
        let svc = service();
        let mut jar = MemoryJar::new();
        let token = svc.mint_at(&mut jar, "alice", T0).unwrap();
        let sig_start = token.rfind(':').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let forged = String::from_utf8(bytes).unwrap();
            jar.insert_raw(COOKIE_NAME, &forged);
            assert_eq!(svc.verify_at(&mut jar, "alice", T0 + 1), Verification::Invalid, "index {}", i);
        }
    }

    #[test]
    fn malformed_cookies_are_invalid() {
        let svc = service();
        let mut jar = MemoryJar::new();
        assert_eq!(svc.verify_at(&mut jar, "alice", T0), Verification::Invalid);
        for raw in ["", "alice", "alice:1", "alice:x:ff", "alice:1:zz", "alice:1:ff:ff", "alice:1:abc"] {
            jar.insert_raw(COOKIE_NAME, raw);
            assert_eq!(svc.verify_at(&mut jar, "alice", 1), Verification::Invalid, "{:?}", raw);
        }
    }

    #[test]
    fn tampered_timestamp_breaks_signature() {
        let svc = service();
        let mut jar = MemoryJar::new();
        let token = svc.mint_at(&mut jar, "alice", T0).unwrap();
        let forged = token.replacen(&T0.to_string(), &(T0 + 60_000).to_string(), 1);
        jar.insert_raw(COOKIE_NAME, &forged);
        assert_eq!(svc.verify_at(&mut jar, "alice", T0 + 61_000), Verification::Invalid);
    }

    #[test]
    fn different_secret_rejects() {
        let mut jar = MemoryJar::new();
        service().mint_at(&mut jar, "alice", T0).unwrap();
        let other = CapabilityTokenService::new(Box::new(DedicatedSecret::new(Some("other".into()))));
        assert_eq!(other.verify_at(&mut jar, "alice", T0), Verification::Invalid);
    }

    #[test]
    fn missing_secret_fails_mint_loudly() {
        let svc = CapabilityTokenService::new(Box::new(DedicatedSecret::new(None)));
        let mut jar = MemoryJar::new();
        assert!(matches!(svc.mint(&mut jar, "alice"), Err(CapabilityError::Configuration(_))));
        assert!(jar.take_headers().is_empty());
    }

    #[test]
    fn removal_keeps_secure_flag() {
        let svc = service().secure(true);
        let mut jar = MemoryJar::new();
        svc.mint_at(&mut jar, "alice", T0).unwrap();
        svc.verify_at(&mut jar, "alice", T0 + 300_001);
        svc.mint_at(&mut jar, "alice", T0).unwrap();
        svc.revoke(&mut jar);

        let headers = jar.take_headers();
        assert_eq!(headers.len(), 4);
        for removal in [&headers[1], &headers[3]] {
            assert!(removal.contains("Max-Age=0"), "{}", removal);
            assert!(removal.contains("; Secure;"), "{}", removal);
        }
    }

    #[test]
    fn revoke_deletes_cookie() {
        let svc = service();
        let mut jar = MemoryJar::new();
        svc.mint(&mut jar, "alice").unwrap();
        assert!(svc.verify(&mut jar, "alice").is_valid());
        svc.revoke(&mut jar);
        assert!(jar.get(COOKIE_NAME).is_none());
        assert!(!svc.verify(&mut jar, "alice").is_valid());
    }
}
