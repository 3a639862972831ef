// src/auth/users.rs — NØN-OS Identity Records
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

pub const ROOT: &str = "root";
pub const ROOT_UID: u32 = 0;

/// Groups whose members may become root without a password.
pub const ESCALATION_GROUPS: [&str; 2] = ["wheel", "sudo"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: u32,
    pub username: String,
    pub groups: BTreeSet<String>,
    pub home: String,
    pub shell: String,
}

impl User {
    pub fn new(uid: u32, username: &str, groups: &[&str]) -> Self {
        let home = if uid == ROOT_UID {
            "/root".to_string()
        } else {
            format!("/home/{}", username)
        };
        Self {
            uid,
            username: username.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            home,
            shell: "/bin/nsh".to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.uid == ROOT_UID
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.contains(group)
    }

    /// Root, or a member of wheel/sudo.
    pub fn can_escalate(&self) -> bool {
        self.is_root() || ESCALATION_GROUPS.iter().any(|g| self.in_group(g))
    }
}

/// The single active identity of one shell. Owned by the command session
/// and handed to every store call; only a successful `su` changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    active_username: String,
}

impl Session {
    pub(crate) fn new(username: &str) -> Self {
        Self { active_username: username.to_string() }
    }

    pub fn username(&self) -> &str {
        &self.active_username
    }

    pub(crate) fn switch_to(&mut self, username: &str) {
        self.active_username = username.to_string();
    }
}

/// Options accepted by `useradd`.
#[derive(Debug, Clone, Default)]
pub struct UserOptions {
    pub uid: Option<u32>,
    pub groups: Vec<String>,
    pub home: Option<String>,
    pub shell: Option<String>,
}

/// Group update for `usermod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChange {
    /// `-G`: supplementary groups become exactly this list.
    Replace(Vec<String>),
    /// `-aG`: add to the existing groups.
    Append(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_derived_from_uid() {
        let root = User::new(0, "root", &["root"]);
        assert!(root.is_root());
        assert!(root.can_escalate());
        assert_eq!(root.home, "/root");

        let op = User::new(1001, "operator", &["operator"]);
        assert!(!op.is_root());
        assert!(!op.can_escalate());
        assert_eq!(op.home, "/home/operator");
    }

    #[test]
    fn wheel_or_sudo_grants_escalation() {
        assert!(User::new(1000, "adm", &["adm", "wheel"]).can_escalate());
        assert!(User::new(1002, "ops", &["sudo"]).can_escalate());
        assert!(!User::new(1003, "guest", &["users", "video"]).can_escalate());
    }
}
