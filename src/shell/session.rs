// src/shell/session.rs — NØN-OS Command Session
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
//
// Two states: Normal, and AwaitingSecret after a `su <user>` that needs a
// password. The next line after the prompt is always consumed as the secret,
// echoed only as a mask, and the session returns to Normal whatever the
// outcome. There is no way to abort the prompt short of answering it.

use tracing::debug;

use crate::auth::{Outcome, PrivilegeStore, Session, ROOT};
use crate::cron::ScheduleRegistry;
use crate::logging::{AuditKind, AuditTrail};

use super::history::History;
use super::interpreter::{CommandContext, CommandInterpreter, DataFacade};
use super::prompt::render_prompt;

pub const SECRET_PROMPT: &str = "Password: ";
pub const MASK_CHAR: char = '*';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingKind {
    Su,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: PendingKind,
    pub target: String,
    /// `su -`: move to the target's home on success.
    pub login: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Normal,
    AwaitingSecret(PendingAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Prompt plus the submitted command.
    Command,
    /// Masked secret echo.
    Masked,
    Output,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub kind: LineKind,
    pub text: String,
}

impl TranscriptLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }
}

/// What the UI should render after one submitted line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// False when input was disabled and the line was dropped.
    pub accepted: bool,
    pub lines: Vec<TranscriptLine>,
    pub prompt: String,
    /// Next input is a secret; the UI must not echo keystrokes.
    pub mask_input: bool,
    pub navigate_to: Option<String>,
    pub refresh_page: bool,
    pub clear_capability_token: bool,
}

/// A parsed `su [-|-l|--login] [user] [password]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuRequest {
    pub target: String,
    pub password: Option<String>,
    pub login: bool,
}

impl SuRequest {
    /// `[-|-l|--login] [user] [password]`, already tokenized. The target
    /// defaults to root.
    pub fn from_args(args: &[String]) -> Self {
        let (login, rest) = match args.split_first() {
            Some((flag, rest)) if matches!(flag.as_str(), "-" | "-l" | "--login") => (true, rest),
            _ => (false, args),
        };
        Self {
            target: rest.first().cloned().unwrap_or_else(|| ROOT.to_string()),
            password: rest.get(1).cloned(),
            login,
        }
    }
}

/// `None` unless the line is an `su` invocation that tokenizes cleanly.
pub fn parse_su(line: &str) -> Option<SuRequest> {
    let words = shell_words::split(line).ok()?;
    match words.split_first() {
        Some((cmd, args)) if cmd == "su" => Some(SuRequest::from_args(args)),
        _ => None,
    }
}

pub struct CommandSession<I> {
    privileges: PrivilegeStore,
    session: Session,
    schedules: ScheduleRegistry,
    audit: AuditTrail,
    interpreter: I,
    state: SessionState,
    history: History,
    host: String,
    cwd: String,
    balance: u64,
    prompt: String,
    input_locked: bool,
}

impl<I: CommandInterpreter> CommandSession<I> {
    pub fn new(privileges: PrivilegeStore, session: Session, interpreter: I) -> Self {
        let session = privileges.resolve_session(session);
        let cwd = privileges
            .current(&session)
            .map(|u| u.home.clone())
            .unwrap_or_else(|| "/".to_string());
        let mut this = Self {
            privileges,
            session,
            schedules: ScheduleRegistry::new(),
            audit: AuditTrail::new(),
            interpreter,
            state: SessionState::Normal,
            history: History::default(),
            host: "nonos".to_string(),
            cwd,
            balance: 0,
            prompt: String::new(),
            input_locked: false,
        };
        this.refresh_prompt();
        this
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self.refresh_prompt();
        self
    }

    pub fn with_schedules(mut self, schedules: ScheduleRegistry) -> Self {
        self.schedules = schedules;
        self
    }

    pub fn with_audit(mut self, audit: AuditTrail) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = History::with_limit(limit);
        self
    }

    pub fn set_balance(&mut self, balance: u64) {
        self.balance = balance;
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn prompt(&self) -> &str {
        match self.state {
            SessionState::AwaitingSecret(_) => SECRET_PROMPT,
            SessionState::Normal => &self.prompt,
        }
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn username(&self) -> &str {
        self.session.username()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn privileges(&self) -> &PrivilegeStore {
        &self.privileges
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn schedules(&self) -> &ScheduleRegistry {
        &self.schedules
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn interpreter_mut(&mut self) -> &mut I {
        &mut self.interpreter
    }

    pub fn is_input_enabled(&self) -> bool {
        !self.input_locked
    }

    /// Called by the host once a requested navigation has happened.
    pub fn release_input(&mut self) {
        self.input_locked = false;
    }

    /// Privilege and schedule snapshots for durable storage.
    pub fn snapshot(&self) -> (String, String) {
        (self.privileges.serialize(&self.session), self.schedules.serialize())
    }

    /// Process one submitted line.
    pub fn submit(&mut self, line: &str) -> Response {
        if self.input_locked {
            debug!("input disabled; line dropped");
            return Response { accepted: false, prompt: self.prompt().to_string(), ..Response::default() };
        }
        match std::mem::replace(&mut self.state, SessionState::Normal) {
            SessionState::AwaitingSecret(pending) => self.resolve_secret(pending, line),
            SessionState::Normal => self.handle_line(line),
        }
    }

    fn handle_line(&mut self, line: &str) -> Response {
        let trimmed = line.trim();
        let mut resp = Response { accepted: true, ..Response::default() };

        if trimmed.is_empty() {
            resp.lines.push(TranscriptLine::new(LineKind::Command, self.prompt.clone()));
            resp.prompt = self.prompt.clone();
            return resp;
        }

        if trimmed.split_whitespace().next() == Some("su") && shell_words::split(trimmed).is_err() {
            // unbalanced quote: may hold half a password, so echo nothing of it
            resp.lines.push(TranscriptLine::new(LineKind::Command, format!("{}su", self.prompt)));
            resp.lines.push(TranscriptLine::new(LineKind::Error, "su: unbalanced quote"));
            resp.prompt = self.prompt.clone();
            return resp;
        }

        if let Some(req) = parse_su(trimmed) {
            let echo = format!("{}su {}{}", self.prompt, if req.login { "- " } else { "" }, req.target);
            if req.password.is_some() {
                // inline credential: dispatch, but keep it out of the echo and history
                resp.lines.push(TranscriptLine::new(LineKind::Command, echo));
                self.dispatch(trimmed, &mut resp);
                self.refresh_prompt();
                resp.prompt = self.prompt.clone();
                return resp;
            }
            if self.needs_secret(&req) {
                resp.lines.push(TranscriptLine::new(LineKind::Command, echo));
                self.state = SessionState::AwaitingSecret(PendingAction {
                    kind: PendingKind::Su,
                    target: req.target,
                    login: req.login,
                });
                resp.prompt = SECRET_PROMPT.to_string();
                resp.mask_input = true;
                return resp;
            }
        }

        resp.lines.push(TranscriptLine::new(LineKind::Command, format!("{}{}", self.prompt, trimmed)));
        self.history.push(trimmed);
        self.dispatch(trimmed, &mut resp);
        self.refresh_prompt();
        resp.prompt = self.prompt.clone();
        resp
    }

    /// A switch that only a password can authorise: non-root target, no
    /// inline credential, and the active user is not root.
    fn needs_secret(&self, req: &SuRequest) -> bool {
        req.target != ROOT && req.password.is_none() && !self.privileges.is_root(&self.session)
    }

    fn dispatch(&mut self, line: &str, resp: &mut Response) {
        let mut ctx = CommandContext {
            user: self.session.username().to_string(),
            cwd: self.cwd.clone(),
            balance: self.balance,
            data: DataFacade {
                privileges: &mut self.privileges,
                session: &mut self.session,
                schedules: &mut self.schedules,
                audit: &mut self.audit,
            },
        };
        let out = self.interpreter.execute(line, &mut ctx);

        resp.lines.extend(out.output_lines.into_iter().map(|l| TranscriptLine::new(LineKind::Output, l)));
        if let Some(err) = out.error_line {
            resp.lines.push(TranscriptLine::new(LineKind::Error, err));
        }
        if let Some(dir) = out.change_dir {
            self.cwd = dir;
        }
        if out.navigate_to.is_some() {
            self.input_locked = true;
        }
        resp.navigate_to = out.navigate_to;
        resp.refresh_page = out.refresh_page;
        resp.clear_capability_token = out.clear_capability_token;
    }

    fn resolve_secret(&mut self, pending: PendingAction, secret: &str) -> Response {
        let mask: String = std::iter::repeat(MASK_CHAR).take(secret.chars().count()).collect();
        let mut resp = Response { accepted: true, ..Response::default() };
        resp.lines.push(TranscriptLine::new(LineKind::Masked, format!("{}{}", SECRET_PROMPT, mask)));

        let actor = self.session.username().to_string();
        let outcome = match pending.kind {
            PendingKind::Su => self.privileges.su(&mut self.session, &pending.target, Some(secret)),
        };
        self.audit.record(AuditKind::Auth, &actor, &format!("su {}", pending.target), outcome.kind());

        match &outcome {
            Outcome::Ok(msg) => {
                if pending.login {
                    if let Some(user) = self.privileges.current(&self.session) {
                        self.cwd = user.home.clone();
                    }
                }
                resp.lines.push(TranscriptLine::new(LineKind::Output, msg.clone()));
            }
            other => resp.lines.push(TranscriptLine::new(LineKind::Error, other.message())),
        }

        self.refresh_prompt();
        resp.prompt = self.prompt.clone();
        resp
    }

    fn refresh_prompt(&mut self) {
        let (is_root, home) = match self.privileges.current(&self.session) {
            Some(u) => (u.is_root(), u.home.as_str()),
            None => (false, ""),
        };
        self.prompt = render_prompt(self.session.username(), is_root, &self.host, &self.cwd, home);
    }
}
