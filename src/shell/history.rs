// src/shell/history.rs — Command history
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies

use std::collections::VecDeque;

pub const HISTORY_LIMIT: usize = 50;

/// Most-recent-first, de-duplicated, bounded.
#[derive(Debug, Clone)]
pub struct History {
    ring: VecDeque<String>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        Self { ring: VecDeque::new(), limit: limit.max(1) }
    }

    pub fn push(&mut self, line: &str) {
        self.ring.retain(|l| l != line);
        self.ring.push_front(line.to_string());
        self.ring.truncate(self.limit);
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.ring.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}
