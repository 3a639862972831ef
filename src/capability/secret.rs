// src/capability/secret.rs — Signing secret resolution
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
//
// Two sources: a dedicated panel secret (required in production) and a
// derivation from other configured material, a degraded mode for local play.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use super::CapabilityError;

type HmacSha256 = Hmac<Sha256>;

const DERIVATION_LABEL: &[u8] = b"nonosh/panel-access-token";

/// Raw HMAC key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([REDACTED])")
    }
}

pub trait SecretResolver: Send + Sync {
    fn resolve(&self) -> Result<SigningKey, CapabilityError>;
}

pub struct DedicatedSecret {
    secret: Option<String>,
}

impl DedicatedSecret {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret: secret.filter(|s| !s.is_empty()) }
    }
}

impl SecretResolver for DedicatedSecret {
    fn resolve(&self) -> Result<SigningKey, CapabilityError> {
        self.secret
            .as_ref()
            .map(|s| SigningKey::new(s.as_bytes()))
            .ok_or_else(|| CapabilityError::Configuration("no panel signing secret configured".into()))
    }
}

/// HMAC-SHA256(material, label). Anyone holding the other secret can mint
/// panel tokens, which is why production refuses this path.
pub struct DerivedFallback {
    material: Option<String>,
}

impl DerivedFallback {
    pub fn new(material: Option<String>) -> Self {
        Self { material: material.filter(|s| !s.is_empty()) }
    }
}

impl SecretResolver for DerivedFallback {
    fn resolve(&self) -> Result<SigningKey, CapabilityError> {
        let material = self.material.as_ref().ok_or_else(|| {
            CapabilityError::Configuration("no signing secret and no fallback material configured".into())
        })?;
        let mut mac = HmacSha256::new_from_slice(material.as_bytes())
            .map_err(|e| CapabilityError::Configuration(e.to_string()))?;
        mac.update(DERIVATION_LABEL);
        Ok(SigningKey::new(mac.finalize().into_bytes().to_vec()))
    }
}

/// Pick the resolver for a deployment. Production only ever gets the
/// dedicated secret, so a missing one fails on first mint.
pub fn resolver_for(
    dedicated: Option<String>,
    fallback_material: Option<String>,
    production: bool,
) -> Box<dyn SecretResolver> {
    let dedicated = dedicated.filter(|s| !s.is_empty());
    if dedicated.is_some() || production {
        return Box::new(DedicatedSecret::new(dedicated));
    }
    warn!("panel signing secret not set; deriving one from fallback material (development only)");
    Box::new(DerivedFallback::new(fallback_material))
}
