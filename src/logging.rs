// src/logging.rs — NØN-OS Shell Logging & Audit Trail
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
// tracing for diagnostics; a hash-chained audit trail for privilege events.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing_subscriber::EnvFilter;

const MAX_ENTRIES: usize = 500;
const GENESIS: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Install the global subscriber. `NONOSH_LOG` wins over `level`.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env("NONOSH_LOG")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    Auth,
    Account,
    Capability,
    Schedule,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: String,
    pub kind: AuditKind,
    pub actor: String,
    pub action: String,
    pub outcome: String,
    /// sha256(previous integrity | this entry's fields)
    pub integrity: String,
}

/// Bounded record of privilege events, optionally mirrored to a JSONL file.
#[derive(Debug)]
pub struct AuditTrail {
    entries: VecDeque<AuditEntry>,
    head: String,
    sink: Option<PathBuf>,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self { entries: VecDeque::new(), head: GENESIS.to_string(), sink: None }
    }
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(path: impl Into<PathBuf>) -> Self {
        Self { sink: Some(path.into()), ..Self::default() }
    }

    pub fn record(&mut self, kind: AuditKind, actor: &str, action: &str, outcome: &str) -> AuditEntry {
        let timestamp = Utc::now().to_rfc3339();
        let integrity = chain(&self.head, &timestamp, kind, actor, action, outcome);
        self.head = integrity.clone();

        let entry = AuditEntry {
            timestamp,
            kind,
            actor: actor.to_string(),
            action: action.to_string(),
            outcome: outcome.to_string(),
            integrity,
        };
        if let Some(path) = &self.sink {
            append_line(path, &entry);
        }
        self.entries.push_back(entry.clone());
        if self.entries.len() > MAX_ENTRIES {
            self.entries.pop_front();
        }
        entry
    }

    /// Most recent `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<&AuditEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recompute the chain over the retained window.
    pub fn verify_chain(&self) -> bool {
        let mut prev: Option<&str> = None;
        for e in &self.entries {
            if let Some(p) = prev {
                let expect = chain(p, &e.timestamp, e.kind, &e.actor, &e.action, &e.outcome);
                if expect != e.integrity {
                    return false;
                }
            }
            prev = Some(&e.integrity);
        }
        true
    }
}

fn chain(prev: &str, timestamp: &str, kind: AuditKind, actor: &str, action: &str, outcome: &str) -> String {
    let mut h = Sha256::new();
    h.update(format!("{}|{}|{:?}|{}|{}|{}", prev, timestamp, kind, actor, action, outcome));
    format!("{:x}", h.finalize())
}

fn append_line(path: &Path, entry: &AuditEntry) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let Ok(line) = serde_json::to_string(entry) else { return };
    let written = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{}", line));
    if let Err(err) = written {
        tracing::warn!(path = %path.display(), error = %err, "audit sink write failed");
    }
}
