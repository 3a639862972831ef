// src/auth/store.rs — NØN-OS Privilege Store
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
// Users, groups and credentials, plus the su/passwd/useradd rules over them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::outcome::Outcome;
use super::users::{GroupChange, Session, User, UserOptions, ROOT};
use super::verifier::{CredentialVerifier, PlaintextVerifier};

/// Identity a fresh shell starts as.
pub const DEFAULT_USER: &str = "operator";

pub struct PrivilegeStore {
    users: BTreeMap<String, User>,
    credentials: BTreeMap<String, String>,
    verifier: Box<dyn CredentialVerifier>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    current_user: String,
    users: Vec<User>,
    credentials: BTreeMap<String, String>,
}

impl Default for PrivilegeStore {
    fn default() -> Self {
        let mut store = Self::empty(Box::new(PlaintextVerifier));
        store.insert(User::new(0, ROOT, &[ROOT]), None);
        store.insert(User::new(1000, "adm", &["adm", "wheel"]), Some("unstable"));
        store.insert(User::new(1001, "operator", &["operator"]), Some("crystal"));
        store
    }
}

impl fmt::Debug for PrivilegeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegeStore")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .field("credentials", &"[REDACTED]")
            .finish()
    }
}

impl PrivilegeStore {
    fn empty(verifier: Box<dyn CredentialVerifier>) -> Self {
        Self { users: BTreeMap::new(), credentials: BTreeMap::new(), verifier }
    }

    /// Default tables with a session logged in as `initial` (falls back to
    /// `DEFAULT_USER` when `initial` does not exist).
    pub fn bootstrap(initial: &str) -> (Self, Session) {
        let store = Self::default();
        let name = if store.users.contains_key(initial) { initial } else { DEFAULT_USER };
        (store, Session::new(name))
    }

    /// Swap the credential verifier. Stored credentials are kept as-is, so
    /// this belongs right after construction.
    pub fn with_verifier(mut self, verifier: Box<dyn CredentialVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    fn insert(&mut self, user: User, secret: Option<&str>) {
        if let Some(secret) = secret {
            self.credentials.insert(user.username.clone(), self.verifier.seal(secret));
        }
        self.users.insert(user.username.clone(), user);
    }

    /// A session for an existing account. The only public way to obtain one
    /// outside `bootstrap`/`deserialize`.
    pub fn session_for(&self, username: &str) -> Option<Session> {
        self.users.contains_key(username).then(|| Session::new(username))
    }

    /// `session` if it names a user of this store, else `DEFAULT_USER`, else
    /// the lowest-uid unprivileged account, else root.
    pub fn resolve_session(&self, session: Session) -> Session {
        if self.users.contains_key(session.username()) {
            return session;
        }
        warn!(user = %session.username(), "session names no known user; falling back");
        self.session_for(DEFAULT_USER)
            .or_else(|| self.users().into_iter().find(|u| !u.is_root()).map(|u| Session::new(&u.username)))
            .unwrap_or_else(|| Session::new(ROOT))
    }

    pub fn user(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    /// Users ordered by uid.
    pub fn users(&self) -> Vec<&User> {
        let mut all: Vec<&User> = self.users.values().collect();
        all.sort_by_key(|u| u.uid);
        all
    }

    pub fn current<'a>(&'a self, session: &Session) -> Option<&'a User> {
        self.users.get(session.username())
    }

    pub fn whoami<'a>(&self, session: &'a Session) -> &'a str {
        session.username()
    }

    /// `uid=1000(adm) gid=1000(adm) groups=adm,wheel`, or the no-such-user line.
    pub fn id(&self, session: &Session, username: Option<&str>) -> String {
        let name = username.unwrap_or(session.username());
        match self.users.get(name) {
            Some(u) => {
                let groups: Vec<&str> = u.groups.iter().map(String::as_str).collect();
                format!(
                    "uid={uid}({name}) gid={uid}({name}) groups={groups}",
                    uid = u.uid,
                    name = u.username,
                    groups = groups.join(",")
                )
            }
            None => format!("id: '{}': no such user", name),
        }
    }

    pub fn groups(&self, session: &Session, username: Option<&str>) -> String {
        let name = username.unwrap_or(session.username());
        match self.users.get(name) {
            Some(u) => u.groups.iter().map(String::as_str).collect::<Vec<_>>().join(" "),
            None => format!("groups: '{}': no such user", name),
        }
    }

    pub fn can_escalate(&self, username: &str) -> bool {
        self.users.get(username).map(User::can_escalate).unwrap_or(false)
    }

    pub fn can_sudo(&self, session: &Session) -> bool {
        self.can_escalate(session.username())
    }

    pub fn is_root(&self, session: &Session) -> bool {
        self.current(session).map(User::is_root).unwrap_or(false)
    }

    /// Switch the session to `target`.
    ///
    /// From root: always allowed. To root: wheel/sudo only, no password.
    /// Anything else needs the target's password.
    pub fn su(&self, session: &mut Session, target: &str, password: Option<&str>) -> Outcome {
        let Some(target_user) = self.users.get(target) else {
            return Outcome::not_found(format!("su: user {} does not exist", target));
        };
        let from = session.username().to_string();

        if self.is_root(session) {
            session.switch_to(target);
            info!(from = %from, to = %target, "su from root");
            return Outcome::ok(format!("switched to {}", target));
        }

        if target_user.is_root() {
            if self.can_escalate(&from) {
                session.switch_to(target);
                info!(from = %from, "su to root granted");
                return Outcome::ok("switched to root");
            }
            warn!(from = %from, "su to root denied");
            return Outcome::denied(format!("su: Permission denied ({} is not in wheel or sudo)", from));
        }

        let matches = match (password, self.credentials.get(target)) {
            (Some(supplied), Some(stored)) => self.verifier.verify(stored, supplied),
            _ => false,
        };
        if !matches {
            warn!(from = %from, to = %target, "su authentication failure");
            return Outcome::failure("su: Authentication failure");
        }
        session.switch_to(target);
        info!(from = %from, to = %target, "su lateral switch");
        Outcome::ok(format!("switched to {}", target))
    }

    pub fn passwd(&mut self, session: &Session, username: &str, new_secret: &str) -> Outcome {
        let caller_is_root = self.is_root(session);
        if !caller_is_root && session.username() != username {
            return Outcome::denied(format!(
                "passwd: You may not view or modify password information for {}.",
                username
            ));
        }
        let Some(user) = self.users.get(username) else {
            return Outcome::not_found(format!("passwd: user '{}' does not exist", username));
        };
        if user.is_root() {
            return Outcome::denied("passwd: root has no password; use wheel membership instead");
        }
        self.credentials.insert(username.to_string(), self.verifier.seal(new_secret));
        info!(by = %session.username(), user = %username, "password updated");
        Outcome::ok("passwd: password updated successfully")
    }

    /// Root only. New users get `max(uid) + 1` and a password equal to their
    /// username, which is never forced to rotate.
    pub fn useradd(&mut self, session: &Session, name: &str, opts: UserOptions) -> Outcome {
        if !self.is_root(session) {
            return Outcome::denied("useradd: Permission denied.");
        }
        if !valid_username(name) {
            return Outcome::invalid(format!("useradd: invalid user name '{}'", name));
        }
        if self.users.contains_key(name) {
            return Outcome::conflict(format!("useradd: user '{}' already exists", name));
        }
        let uid = match opts.uid {
            Some(uid) if self.users.values().any(|u| u.uid == uid) => {
                return Outcome::conflict(format!("useradd: UID {} is not unique", uid));
            }
            Some(uid) => uid,
            None => match self.users.values().map(|u| u.uid).max().unwrap_or(0).checked_add(1) {
                Some(uid) => uid,
                None => return Outcome::conflict("useradd: no free UID"),
            },
        };

        let mut user = User::new(uid, name, &[name]);
        user.groups.extend(opts.groups.into_iter().filter(|g| !g.is_empty()));
        if let Some(home) = opts.home {
            user.home = home;
        }
        if let Some(shell) = opts.shell {
            user.shell = shell;
        }
        self.insert(user, Some(name));
        info!(user = %name, uid, "user added");
        Outcome::ok(format!("useradd: created user '{}' (uid {})", name, uid))
    }

    pub fn usermod(&mut self, session: &Session, name: &str, change: GroupChange) -> Outcome {
        if !self.is_root(session) {
            return Outcome::denied("usermod: Permission denied.");
        }
        let Some(user) = self.users.get_mut(name) else {
            return Outcome::not_found(format!("usermod: user '{}' does not exist", name));
        };
        match change {
            GroupChange::Replace(groups) => {
                // The primary group always stays.
                user.groups.retain(|g| g == name);
                user.groups.extend(groups);
            }
            GroupChange::Append(groups) => user.groups.extend(groups),
        }
        user.groups.retain(|g| !g.is_empty());
        debug!(user = %name, groups = ?user.groups, "groups updated");
        Outcome::ok(format!("usermod: groups for '{}' updated", name))
    }

    pub fn serialize(&self, session: &Session) -> String {
        let snapshot = Snapshot {
            current_user: session.username().to_string(),
            users: self.users().into_iter().cloned().collect(),
            credentials: self.credentials.clone(),
        };
        serde_json::to_string(&snapshot).unwrap_or_default()
    }

    /// Restore a snapshot. Anything unreadable or inconsistent yields the
    /// bootstrap store instead of an error.
    pub fn deserialize(data: &str) -> (Self, Session) {
        match serde_json::from_str::<Snapshot>(data) {
            Ok(snapshot) => match Self::from_snapshot(snapshot) {
                Some(restored) => restored,
                None => {
                    warn!("privilege snapshot violates invariants; using bootstrap store");
                    Self::bootstrap(DEFAULT_USER)
                }
            },
            Err(err) => {
                warn!(error = %err, "privilege snapshot unreadable; using bootstrap store");
                Self::bootstrap(DEFAULT_USER)
            }
        }
    }

    fn from_snapshot(snapshot: Snapshot) -> Option<(Self, Session)> {
        let mut store = Self::empty(Box::new(PlaintextVerifier));
        for user in snapshot.users {
            let uid_taken = store.users.values().any(|u| u.uid == user.uid);
            if uid_taken || store.users.contains_key(&user.username) {
                return None;
            }
            store.users.insert(user.username.clone(), user);
        }

        let root = store.users.get(ROOT)?;
        if !root.is_root() || store.users.values().filter(|u| u.is_root()).count() != 1 {
            return None;
        }
        if !store.users.contains_key(&snapshot.current_user) {
            return None;
        }
        // Every non-root user has exactly one credential; root has none.
        for (name, user) in &store.users {
            if user.is_root() == snapshot.credentials.contains_key(name) {
                return None;
            }
        }
        if snapshot.credentials.keys().any(|k| !store.users.contains_key(k)) {
            return None;
        }
        store.credentials = snapshot.credentials;
        Some((store, Session::new(&snapshot.current_user)))
    }
}

fn valid_username(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 32
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !name.starts_with('-')
}
