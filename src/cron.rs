// src/cron.rs — NØN-OS Schedule Registry
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
// Catalog of intended schedules. Nothing here parses or fires them.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: u64,
    pub schedule: String,
    pub command: String,
    pub owner: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct ScheduleRegistry {
    entries: Vec<ScheduleEntry>,
    next_id: u64,
}

impl Default for ScheduleRegistry {
    fn default() -> Self {
        Self { entries: Vec::new(), next_id: 1 }
    }
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, schedule: &str, command: &str, owner: &str) -> ScheduleEntry {
        let entry = ScheduleEntry {
            id: self.next_id,
            schedule: schedule.to_string(),
            command: command.to_string(),
            owner: owner.to_string(),
            enabled: true,
        };
        self.next_id += 1;
        self.entries.push(entry.clone());
        debug!(id = entry.id, owner = %owner, "schedule registered");
        entry
    }

    /// Whether an entry with `id` existed.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before != self.entries.len()
    }

    pub fn get(&self, id: u64) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn list(&self) -> Vec<ScheduleEntry> {
        self.entries.clone()
    }

    pub fn list_for(&self, owner: &str) -> Vec<ScheduleEntry> {
        self.entries.iter().filter(|e| e.owner == owner).cloned().collect()
    }

    pub fn serialize(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".into())
    }

    /// Unreadable input gives an empty registry. Ids continue after the
    /// highest restored one.
    pub fn deserialize(data: &str) -> Self {
        match serde_json::from_str::<Vec<ScheduleEntry>>(data) {
            Ok(entries) => {
                let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
                Self { entries, next_id }
            }
            Err(err) => {
                warn!(error = %err, "schedule snapshot unreadable; starting empty");
                Self::default()
            }
        }
    }
}
