// src/auth/mod.rs — NØN-OS Identity Engine
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
//
// Unix-like privilege model for the simulated shell:
// - root (uid 0) may become anyone without a password
// - wheel/sudo members may become root without a password
// - every other switch needs the target's credential

mod outcome;
mod store;
mod users;
mod verifier;

pub use outcome::Outcome;
pub use store::{PrivilegeStore, DEFAULT_USER};
pub use users::{GroupChange, Session, User, UserOptions, ESCALATION_GROUPS, ROOT, ROOT_UID};
pub use verifier::{CredentialVerifier, PlaintextVerifier};
