// src/auth/verifier.rs — Credential comparison seam
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
//
// Credentials are stored and compared as plaintext (known weakness). A hashed
// verifier can replace `PlaintextVerifier` without touching the store.

/// Seals secrets before storage and checks supplied secrets against them.
pub trait CredentialVerifier: Send + Sync {
    /// Transform a new secret into its stored form.
    fn seal(&self, secret: &str) -> String;

    /// Whether `supplied` matches the `stored` form.
    fn verify(&self, stored: &str, supplied: &str) -> bool;
}

/// Exact string equality against the stored plaintext.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn seal(&self, secret: &str) -> String {
        secret.to_string()
    }

    fn verify(&self, stored: &str, supplied: &str) -> bool {
        stored == supplied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_is_exact_match() {
        let v = PlaintextVerifier;
        let stored = v.seal("crystal");
        assert!(v.verify(&stored, "crystal"));
        assert!(!v.verify(&stored, "Crystal"));
        assert!(!v.verify(&stored, "crystal "));
        assert!(!v.verify(&stored, ""));
    }
}
