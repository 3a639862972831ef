// src/lib.rs — NØN-OS Shell Core
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
// Privilege model, panel capability tokens and the command session of the
// simulated NØN-OS shell.

pub mod auth;
pub mod capability;
pub mod config;
pub mod cron;
pub mod logging;
pub mod shell;

pub use auth::{Outcome, PrivilegeStore, Session};
pub use capability::{CapabilityTokenService, Verification};
pub use config::Config;
pub use cron::{ScheduleEntry, ScheduleRegistry};
pub use shell::{Builtins, CommandSession};
