// src/shell/builtins.rs — NØN-OS Shell Builtins
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
// Account, schedule and panel-capability commands over the data façade.

use crate::auth::{GroupChange, Outcome, UserOptions};
use crate::capability::{CapabilityTokenService, MemoryJar, Verification};
use crate::logging::AuditKind;

use super::interpreter::{CommandContext, CommandInterpreter, CommandOutput};
use super::session::SuRequest;

type Handler = fn(&mut Builtins, &[String], &mut CommandContext<'_>) -> CommandOutput;

struct Command {
    name: &'static str,
    help: &'static str,
    run: Handler,
}

const COMMANDS: &[Command] = &[
    Command { name: "help",     help: "help — list commands",                          run: cmd_help },
    Command { name: "whoami",   help: "whoami",                                        run: cmd_whoami },
    Command { name: "id",       help: "id [user]",                                     run: cmd_id },
    Command { name: "groups",   help: "groups [user]",                                 run: cmd_groups },
    Command { name: "users",    help: "users — list accounts",                         run: cmd_users },
    Command { name: "su",       help: "su [-] [user] [password]",                      run: cmd_su },
    Command { name: "passwd",   help: "passwd [user] <new password>",                  run: cmd_passwd },
    Command { name: "useradd",  help: "useradd [-u uid] [-G g1,g2] [-d home] [-s shell] <name>", run: cmd_useradd },
    Command { name: "usermod",  help: "usermod (-G|-aG) g1,g2 <name>",                 run: cmd_usermod },
    Command { name: "pwd",      help: "pwd",                                           run: cmd_pwd },
    Command { name: "cd",       help: "cd [path]",                                     run: cmd_cd },
    Command { name: "crontab",  help: "crontab (-l | -a \"<schedule>\" <command> | -r <id>)", run: cmd_crontab },
    Command { name: "balance",  help: "balance — crystal balance",                     run: cmd_balance },
    Command { name: "unlock",   help: "unlock — open the control panel (root)",        run: cmd_unlock },
    Command { name: "panel",    help: "panel — enter the control panel",               run: cmd_panel },
    Command { name: "lock",     help: "lock — drop panel access",                      run: cmd_lock },
    Command { name: "audit",    help: "audit [n] — recent privilege events (root)",    run: cmd_audit },
    Command { name: "clear",    help: "clear",                                         run: cmd_clear },
];

/// The shell's own interpreter: privilege, schedule and panel commands.
pub struct Builtins {
    tokens: CapabilityTokenService,
    jar: MemoryJar,
    subject_id: String,
    panel_route: String,
}

impl Builtins {
    pub fn new(tokens: CapabilityTokenService, subject_id: &str, panel_route: &str) -> Self {
        Self {
            tokens,
            jar: MemoryJar::new(),
            subject_id: subject_id.to_string(),
            panel_route: panel_route.to_string(),
        }
    }

    pub fn jar(&self) -> &MemoryJar {
        &self.jar
    }

}

impl CommandInterpreter for Builtins {
    fn execute(&mut self, line: &str, ctx: &mut CommandContext<'_>) -> CommandOutput {
        let args = match shell_words::split(line) {
            Ok(args) => args,
            Err(err) => return CommandOutput::error(format!("nsh: {}", err)),
        };
        let Some(name) = args.first() else {
            return CommandOutput::default();
        };
        match COMMANDS.iter().find(|c| c.name == name.as_str()) {
            Some(cmd) => (cmd.run)(self, &args[1..], ctx),
            None => CommandOutput::error(format!("{}: command not found", name)),
        }
    }
}

fn render(outcome: Outcome) -> CommandOutput {
    match outcome {
        Outcome::Ok(msg) => CommandOutput::line(msg),
        other => CommandOutput::error(other.message()),
    }
}

fn cmd_help(_: &mut Builtins, _: &[String], _: &mut CommandContext<'_>) -> CommandOutput {
    CommandOutput::lines(COMMANDS.iter().map(|c| format!("  {:<9} {}", c.name, c.help)))
}

fn cmd_whoami(_: &mut Builtins, _: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    CommandOutput::line(ctx.data.privileges.whoami(ctx.data.session))
}

fn cmd_id(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    let line = ctx.data.privileges.id(ctx.data.session, args.first().map(String::as_str));
    if line.starts_with("id: ") {
        CommandOutput::error(line)
    } else {
        CommandOutput::line(line)
    }
}

fn cmd_groups(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    CommandOutput::line(ctx.data.privileges.groups(ctx.data.session, args.first().map(String::as_str)))
}

fn cmd_users(_: &mut Builtins, _: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    CommandOutput::lines(ctx.data.privileges.users().into_iter().map(|u| {
        let groups: Vec<&str> = u.groups.iter().map(String::as_str).collect();
        format!("{:>5}  {:<12} {:<24} {}", u.uid, u.username, groups.join(","), u.home)
    }))
}

fn cmd_su(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    let req = SuRequest::from_args(args);
    let actor = ctx.user.clone();
    let outcome = ctx.data.privileges.su(ctx.data.session, &req.target, req.password.as_deref());
    ctx.data.audit.record(AuditKind::Auth, &actor, &format!("su {}", req.target), outcome.kind());

    let mut out = render(outcome.clone());
    if outcome.is_ok() && req.login {
        out.change_dir = ctx.data.privileges.current(ctx.data.session).map(|u| u.home.clone());
    }
    out
}

fn cmd_passwd(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    let (user, secret) = match args {
        [secret] => (ctx.user.clone(), secret),
        [user, secret] => (user.clone(), secret),
        _ => return CommandOutput::error("usage: passwd [user] <new password>"),
    };
    let outcome = ctx.data.privileges.passwd(ctx.data.session, &user, secret);
    ctx.data.audit.record(AuditKind::Account, &ctx.user, &format!("passwd {}", user), outcome.kind());
    render(outcome)
}

fn cmd_useradd(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    const USAGE: &str = "usage: useradd [-u uid] [-G g1,g2] [-d home] [-s shell] <name>";
    let mut opts = UserOptions::default();
    let mut name: Option<&String> = None;
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-u" => match it.next().and_then(|v| v.parse().ok()) {
                Some(uid) => opts.uid = Some(uid),
                None => return CommandOutput::error("useradd: invalid uid"),
            },
            "-G" => match it.next() {
                Some(list) => opts.groups = split_groups(list),
                None => return CommandOutput::error(USAGE),
            },
            "-d" => opts.home = it.next().cloned(),
            "-s" => opts.shell = it.next().cloned(),
            _ if name.is_none() && !arg.starts_with('-') => name = Some(arg),
            _ => return CommandOutput::error(USAGE),
        }
    }
    let Some(name) = name else {
        return CommandOutput::error(USAGE);
    };
    let outcome = ctx.data.privileges.useradd(ctx.data.session, name, opts);
    ctx.data.audit.record(AuditKind::Account, &ctx.user, &format!("useradd {}", name), outcome.kind());
    render(outcome)
}

fn cmd_usermod(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    let change = match args {
        [flag, list, _] if flag == "-G" => GroupChange::Replace(split_groups(list)),
        [flag, list, _] if flag == "-aG" => GroupChange::Append(split_groups(list)),
        [a, g, list, _] if a == "-a" && g == "-G" => GroupChange::Append(split_groups(list)),
        _ => return CommandOutput::error("usage: usermod (-G|-aG) g1,g2 <name>"),
    };
    let Some(name) = args.last() else {
        return CommandOutput::default();
    };
    let outcome = ctx.data.privileges.usermod(ctx.data.session, name, change);
    ctx.data.audit.record(AuditKind::Account, &ctx.user, &format!("usermod {}", name), outcome.kind());
    render(outcome)
}

fn split_groups(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|g| !g.is_empty()).map(str::to_string).collect()
}

fn cmd_pwd(_: &mut Builtins, _: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    CommandOutput::line(ctx.cwd.clone())
}

fn cmd_cd(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    let home = ctx
        .data
        .privileges
        .current(ctx.data.session)
        .map(|u| u.home.clone())
        .unwrap_or_else(|| "/".into());
    let target = resolve_path(&ctx.cwd, &home, args.first().map(String::as_str));
    CommandOutput { change_dir: Some(target), ..CommandOutput::default() }
}

/// Lexical path resolution; existence is the filesystem's business.
pub fn resolve_path(cwd: &str, home: &str, arg: Option<&str>) -> String {
    let joined = match arg {
        None | Some("~") => home.to_string(),
        Some(p) if p.starts_with("~/") => format!("{}/{}", home, &p[2..]),
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("{}/{}", cwd, p),
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    format!("/{}", parts.join("/"))
}

fn cmd_crontab(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    let is_root = ctx.data.privileges.is_root(ctx.data.session);
    match args {
        [flag] if flag == "-l" => {
            let entries = if is_root {
                ctx.data.schedules.list()
            } else {
                ctx.data.schedules.list_for(&ctx.user)
            };
            if entries.is_empty() {
                return CommandOutput::line(format!("no crontab for {}", ctx.user));
            }
            CommandOutput::lines(
                entries
                    .iter()
                    .map(|e| format!("{:>3}  {:<16} {:<24} # {}", e.id, e.schedule, e.command, e.owner)),
            )
        }
        [flag, schedule, command @ ..] if flag == "-a" && !command.is_empty() => {
            let entry = ctx.data.schedules.add(schedule, &command.join(" "), &ctx.user);
            ctx.data.audit.record(AuditKind::Schedule, &ctx.user, &format!("crontab -a {}", entry.id), "ok");
            CommandOutput::line(format!("crontab: installed entry {}", entry.id))
        }
        [flag, id] if flag == "-r" => {
            let Ok(id) = id.parse::<u64>() else {
                return CommandOutput::error(format!("crontab: invalid id '{}'", id));
            };
            match ctx.data.schedules.get(id) {
                None => CommandOutput::error(format!("crontab: no entry {}", id)),
                Some(e) if !is_root && e.owner != ctx.user => {
                    CommandOutput::error(format!("crontab: entry {} belongs to {}", id, e.owner))
                }
                Some(_) => {
                    ctx.data.schedules.remove(id);
                    ctx.data.audit.record(AuditKind::Schedule, &ctx.user, &format!("crontab -r {}", id), "ok");
                    CommandOutput::line(format!("crontab: removed entry {}", id))
                }
            }
        }
        _ => CommandOutput::error("usage: crontab (-l | -a \"<schedule>\" <command> | -r <id>)"),
    }
}

fn cmd_balance(_: &mut Builtins, _: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    CommandOutput::line(format!("{} crystals", ctx.balance))
}

fn cmd_unlock(b: &mut Builtins, _: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    if !ctx.data.privileges.is_root(ctx.data.session) {
        ctx.data.audit.record(AuditKind::Capability, &ctx.user, "unlock", "auth_denied");
        return CommandOutput::error("unlock: Permission denied (try su)");
    }
    match b.tokens.mint(&mut b.jar, &b.subject_id) {
        Ok(_) => {
            ctx.data.audit.record(AuditKind::Capability, &ctx.user, "unlock", "ok");
            CommandOutput {
                output_lines: vec![format!("panel unlocked for {}s", b.tokens.ttl().as_secs())],
                navigate_to: Some(b.panel_route.clone()),
                ..CommandOutput::default()
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "unlock failed");
            CommandOutput::error("unlock: panel signing is not configured")
        }
    }
}

fn cmd_panel(b: &mut Builtins, _: &[String], _: &mut CommandContext<'_>) -> CommandOutput {
    match b.tokens.verify(&mut b.jar, &b.subject_id) {
        Verification::Valid { .. } => CommandOutput {
            output_lines: vec!["panel: access granted".into()],
            navigate_to: Some(b.panel_route.clone()),
            ..CommandOutput::default()
        },
        Verification::Invalid => CommandOutput::error("panel: locked; run 'unlock' as root"),
    }
}

fn cmd_lock(b: &mut Builtins, _: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    b.tokens.revoke(&mut b.jar);
    ctx.data.audit.record(AuditKind::Capability, &ctx.user, "lock", "ok");
    CommandOutput {
        output_lines: vec!["panel locked".into()],
        clear_capability_token: true,
        ..CommandOutput::default()
    }
}

fn cmd_clear(_: &mut Builtins, _: &[String], _: &mut CommandContext<'_>) -> CommandOutput {
    CommandOutput { refresh_page: true, ..CommandOutput::default() }
}

fn cmd_audit(_: &mut Builtins, args: &[String], ctx: &mut CommandContext<'_>) -> CommandOutput {
    if !ctx.data.privileges.is_root(ctx.data.session) {
        return CommandOutput::error("audit: Permission denied");
    }
    let limit = args.first().and_then(|n| n.parse().ok()).unwrap_or(20);
    CommandOutput::lines(
        ctx.data
            .audit
            .recent(limit)
            .into_iter()
            .map(|e| format!("[{}] {:?} {} :: {} => {}", e.timestamp, e.kind, e.actor, e.action, e.outcome)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PrivilegeStore, Session};
    use crate::capability::DedicatedSecret;
    use crate::cron::ScheduleRegistry;
    use crate::logging::AuditTrail;
    use crate::shell::DataFacade;

    struct Rig {
        builtins: Builtins,
        store: PrivilegeStore,
        session: Session,
        schedules: ScheduleRegistry,
        audit: AuditTrail,
    }

    impl Rig {
        fn new(user: &str) -> Self {
            let tokens = CapabilityTokenService::new(Box::new(DedicatedSecret::new(Some("k".into()))));
            Self {
                builtins: Builtins::new(tokens, "player-1", "/panel"),
                store: PrivilegeStore::default(),
                session: Session::new(user),
                schedules: ScheduleRegistry::new(),
                audit: AuditTrail::new(),
            }
        }

        fn run(&mut self, line: &str) -> CommandOutput {
            let mut ctx = CommandContext {
                user: self.session.username().to_string(),
                cwd: "/home/operator".into(),
                balance: 42,
                data: DataFacade {
                    privileges: &mut self.store,
                    session: &mut self.session,
                    schedules: &mut self.schedules,
                    audit: &mut self.audit,
                },
            };
            self.builtins.execute(line, &mut ctx)
        }
    }

    #[test]
    fn quoted_arguments_and_unbalanced_quotes() {
        let mut rig = Rig::new("operator");
        rig.run(r#"crontab -a "*/5 * * * *" mint all"#);
        assert_eq!(rig.schedules.get(1).unwrap().schedule, "*/5 * * * *");
        assert_eq!(rig.schedules.get(1).unwrap().command, "mint all");

        let out = rig.run(r#"crontab -a "@daily harvest"#);
        assert!(out.error_line.unwrap().starts_with("nsh: "));
        assert!(rig.schedules.get(2).is_none());
    }

    #[test]
    fn inline_password_may_contain_spaces() {
        let mut rig = Rig::new("root");
        assert!(rig.run("useradd eve").error_line.is_none());
        assert!(rig.run("passwd eve 'my pass'").error_line.is_none());
        rig.run("su operator");
        assert_eq!(rig.session.username(), "operator");

        assert!(rig.run("su eve my").error_line.is_some());
        assert_eq!(rig.session.username(), "operator");
        assert!(rig.run("su eve 'my pass'").error_line.is_none());
        assert_eq!(rig.session.username(), "eve");
    }

    #[test]
    fn resolve_path_lexically() {
        assert_eq!(resolve_path("/home/adm", "/home/adm", None), "/home/adm");
        assert_eq!(resolve_path("/var", "/home/adm", Some("~/x/../y")), "/home/adm/y");
        assert_eq!(resolve_path("/var/log", "/root", Some("../../..")), "/");
        assert_eq!(resolve_path("/var", "/root", Some("log/./nonos")), "/var/log/nonos");
    }

    #[test]
    fn identity_commands() {
        let mut rig = Rig::new("adm");
        assert_eq!(rig.run("whoami").output_lines, vec!["adm"]);
        assert_eq!(rig.run("id operator").output_lines, vec!["uid=1001(operator) gid=1001(operator) groups=operator"]);
        assert!(rig.run("id ghost").error_line.is_some());
        assert_eq!(rig.run("balance").output_lines, vec!["42 crystals"]);
        assert_eq!(rig.run("frobnicate").error_line.as_deref(), Some("frobnicate: command not found"));
    }

    #[test]
    fn su_and_account_management() {
        let mut rig = Rig::new("adm");
        let out = rig.run("su -");
        assert!(out.error_line.is_none());
        assert_eq!(out.change_dir.as_deref(), Some("/root"));
        assert_eq!(rig.session.username(), "root");

        assert!(rig.run("useradd -G wheel,video eve").error_line.is_none());
        assert_eq!(rig.store.user("eve").unwrap().uid, 1002);
        assert!(rig.run("usermod -aG audio eve").error_line.is_none());
        assert_eq!(rig.run("groups eve").output_lines, vec!["audio eve video wheel"]);
        assert!(rig.run("usermod eve").error_line.is_some());
        assert!(rig.run("passwd eve hunter2").error_line.is_none());

        rig.run("su operator");
        assert!(rig.run("su eve hunter2").error_line.is_none());
        assert_eq!(rig.session.username(), "eve");
        assert!(rig.audit.len() >= 5);
    }

    #[test]
    fn crontab_ownership() {
        let mut rig = Rig::new("operator");
        assert_eq!(rig.run(r#"crontab -a "@hourly" mint crystals"#).output_lines, vec!["crontab: installed entry 1"]);
        assert_eq!(rig.schedules.get(1).unwrap().command, "mint crystals");
        assert_eq!(rig.run("crontab -l").output_lines.len(), 1);

        rig.run("su adm unstable");
        assert_eq!(rig.run("crontab -l").output_lines, vec!["no crontab for adm"]);
        assert!(rig.run("crontab -r 1").error_line.unwrap().contains("belongs to operator"));
        rig.run("su root");
        assert!(rig.run("crontab -r 1").error_line.is_none());
        assert!(rig.run("crontab -r 1").error_line.is_some());
    }

    #[test]
    fn unlock_panel_lock_cycle() {
        let mut rig = Rig::new("operator");
        assert!(rig.run("unlock").error_line.is_some());
        assert!(rig.run("panel").error_line.is_some());

        rig.run("su adm unstable");
        rig.run("su root");
        let out = rig.run("unlock");
        assert_eq!(out.navigate_to.as_deref(), Some("/panel"));
        assert!(rig.builtins.jar().cookie(crate::capability::COOKIE_NAME).is_some());
        assert!(rig.run("panel").navigate_to.is_some());

        let out = rig.run("lock");
        assert!(out.clear_capability_token);
        assert!(rig.run("panel").error_line.is_some());
    }

    #[test]
    fn audit_is_root_only() {
        let mut rig = Rig::new("operator");
        rig.run("su root");
        assert!(rig.run("audit").error_line.is_some());
        rig.session = Session::new("root");
        assert_eq!(rig.run("audit 1").output_lines.len(), 1);
    }

    #[test]
    fn clear_and_unknown() {
        let mut rig = Rig::new("operator");
        assert!(rig.run("clear").refresh_page);
        assert_eq!(rig.run("rm -rf /").error_line.as_deref(), Some("rm: command not found"));
    }
}
