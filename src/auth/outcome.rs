// src/auth/outcome.rs — Tagged results for privilege operations
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies

use std::fmt;

/// Result of a privilege operation. Always data, never a panic: callers
/// render the message straight into the console transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok(String),
    /// Wrong or missing credential.
    AuthFailure(String),
    /// Caller lacks the group membership or identity required.
    AuthDenied(String),
    NotFound(String),
    /// Name or uid already taken.
    Conflict(String),
    /// Malformed argument, e.g. an unusable user name.
    Invalid(String),
}

impl Outcome {
    pub fn ok(msg: impl Into<String>) -> Self {
        Outcome::Ok(msg.into())
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Outcome::AuthFailure(msg.into())
    }

    pub fn denied(msg: impl Into<String>) -> Self {
        Outcome::AuthDenied(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Outcome::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Outcome::Conflict(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Outcome::Invalid(msg.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Ok(m)
            | Outcome::AuthFailure(m)
            | Outcome::AuthDenied(m)
            | Outcome::NotFound(m)
            | Outcome::Conflict(m)
            | Outcome::Invalid(m) => m,
        }
    }

    /// Short tag used by the audit trail.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Ok(_) => "ok",
            Outcome::AuthFailure(_) => "auth_failure",
            Outcome::AuthDenied(_) => "auth_denied",
            Outcome::NotFound(_) => "not_found",
            Outcome::Conflict(_) => "conflict",
            Outcome::Invalid(_) => "invalid",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_and_kind_follow_variant() {
        let o = Outcome::denied("su: Permission denied");
        assert_eq!(o.message(), "su: Permission denied");
        assert_eq!(o.kind(), "auth_denied");
        assert!(!o.is_ok());
        assert_eq!(o.to_string(), "su: Permission denied");
        assert!(Outcome::ok("").is_ok());
    }
}
