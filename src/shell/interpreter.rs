// src/shell/interpreter.rs — Command interpreter contract
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies

use crate::auth::{PrivilegeStore, Session};
use crate::cron::ScheduleRegistry;
use crate::logging::AuditTrail;

/// Mutable state a command may read or change.
pub struct DataFacade<'a> {
    pub privileges: &'a mut PrivilegeStore,
    pub session: &'a mut Session,
    pub schedules: &'a mut ScheduleRegistry,
    pub audit: &'a mut AuditTrail,
}

/// Snapshot handed to the interpreter with each line.
pub struct CommandContext<'a> {
    pub user: String,
    pub cwd: String,
    pub balance: u64,
    pub data: DataFacade<'a>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub output_lines: Vec<String>,
    pub error_line: Option<String>,
    /// Route the UI should move to; input stays disabled until it has.
    pub navigate_to: Option<String>,
    pub refresh_page: bool,
    pub clear_capability_token: bool,
    /// New working directory, as resolved by the filesystem.
    pub change_dir: Option<String>,
}

impl CommandOutput {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { output_lines: lines.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn line(line: impl Into<String>) -> Self {
        Self { output_lines: vec![line.into()], ..Self::default() }
    }

    pub fn error(line: impl Into<String>) -> Self {
        Self { error_line: Some(line.into()), ..Self::default() }
    }
}

pub trait CommandInterpreter {
    fn execute(&mut self, line: &str, ctx: &mut CommandContext<'_>) -> CommandOutput;
}
