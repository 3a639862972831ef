// src/main.rs — nonosh Entrypoint
// Written with hearth and respect of peoples value
// As privacy is a fundamental human right
// eK <3

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::cursor::MoveTo;
use crossterm::terminal::{self, Clear, ClearType};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use nonosh::auth::PrivilegeStore;
use nonosh::capability::{MemoryJar, Verification};
use nonosh::config::Config;
use nonosh::cron::ScheduleRegistry;
use nonosh::logging::{init_tracing, AuditTrail};
use nonosh::shell::{Builtins, CommandSession, LineKind, SessionState, MASK_CHAR};

const PRIVILEGES_FILE: &str = "privileges.json";
const SCHEDULES_FILE: &str = "schedules.json";

#[derive(Parser)]
#[command(
    name = "nonosh",
    version,
    author = "NØNOS core@dev",
    about = "nonosh — NØN-OS simulated multi-user shell",
    long_about = "nonosh runs the NØN-OS game shell: su/passwd/useradd over a simulated user table, masked credential prompts, and the signed panel-access capability."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (default /etc/nonos/nonosh.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable JSON output
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell over stdin (default)
    Shell,
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Mint a panel capability and print its Set-Cookie header
    Mint {
        #[arg(long)]
        subject: String,
    },
    /// Check a panel_access_token cookie value for a subject
    Verify {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        cookie: String,
    },
}

#[derive(Debug, Error)]
enum StorageError {
    #[error("cannot read state file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write state file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("[config] {}", err);
            return ExitCode::from(2);
        }
    };
    init_tracing(&cfg.logging.level);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => run_shell(&cfg),
        Commands::Token { action } => match action {
            TokenAction::Mint { subject } => mint_token(&cfg, &subject, cli.json),
            TokenAction::Verify { subject, cookie } => verify_token(&cfg, &subject, &cookie, cli.json),
        },
    }
}

fn mint_token(cfg: &Config, subject: &str, json_out: bool) -> ExitCode {
    let service = cfg.capability.build_service();
    let mut jar = MemoryJar::new();
    match service.mint(&mut jar, subject) {
        Ok(token) => {
            let header = jar.take_headers().pop().unwrap_or_default();
            if json_out {
                println!("{}", json!({ "subject": subject, "token": token, "set_cookie": header }));
            } else {
                println!("Set-Cookie: {}", header);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("[token] {}", err);
            ExitCode::from(2)
        }
    }
}

fn verify_token(cfg: &Config, subject: &str, cookie: &str, json_out: bool) -> ExitCode {
    let service = cfg.capability.build_service();
    let mut jar = MemoryJar::new();
    jar.insert_raw(service.cookie_name(), cookie);
    let valid = matches!(service.verify(&mut jar, subject), Verification::Valid { .. });
    if json_out {
        println!("{}", json!({ "subject": subject, "valid": valid }));
    } else {
        println!("{}", if valid { "valid" } else { "invalid" });
    }
    if valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn run_shell(cfg: &Config) -> ExitCode {
    let state_dir = cfg.storage.state_dir.as_deref();
    let (store, session, schedules) = match state_dir {
        Some(dir) => match load_state(dir, &cfg.shell.initial_user) {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "state unavailable; starting fresh");
                fresh_state(&cfg.shell.initial_user)
            }
        },
        None => fresh_state(&cfg.shell.initial_user),
    };

    let audit = match &cfg.logging.audit_log {
        Some(path) => AuditTrail::with_sink(path),
        None => AuditTrail::new(),
    };
    let builtins = Builtins::new(
        cfg.capability.build_service(),
        &cfg.shell.subject_id,
        &cfg.capability.unlock_route,
    );
    let mut shell = CommandSession::new(store, session, builtins)
        .with_host(&cfg.shell.hostname)
        .with_schedules(schedules)
        .with_audit(audit)
        .with_history_limit(cfg.shell.history_limit);
    shell.set_balance(cfg.shell.balance);

    println!("NØN-OS shell up. Type 'help'.");
    let stdin = io::stdin();
    let interactive = stdin.is_terminal();
    let mut input = stdin.lock();

    loop {
        print!("{}", colour_prompt(shell.prompt(), shell.privileges().is_root(shell.session())));
        let _ = io::stdout().flush();

        let awaiting = matches!(shell.state(), SessionState::AwaitingSecret(_));
        let line = if awaiting && interactive { read_secret() } else { read_plain(&mut input) };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(error = %err, "input error");
                break;
            }
        };
        if !awaiting && matches!(line.trim(), "exit" | "logout") {
            break;
        }
        if !interactive {
            println!();
        }

        let resp = shell.submit(&line);
        for l in &resp.lines {
            match l.kind {
                LineKind::Output => println!("{}", l.text),
                LineKind::Error => println!("{}", l.text.red()),
                LineKind::Command | LineKind::Masked => {}
            }
        }
        if resp.refresh_page && interactive {
            let _ = crossterm::execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
        }
        if let Some(route) = &resp.navigate_to {
            println!("{}", format!("[nav] -> {}", route).cyan());
            shell.release_input();
        }
    }

    if let Some(dir) = state_dir {
        match save_state(dir, &shell.snapshot()) {
            Ok(()) => info!(dir = %dir.display(), "state saved"),
            Err(err) => eprintln!("[state] {}", err),
        }
    }
    ExitCode::SUCCESS
}

fn colour_prompt(prompt: &str, is_root: bool) -> String {
    if is_root {
        prompt.red().bold().to_string()
    } else {
        prompt.green().to_string()
    }
}

fn fresh_state(initial_user: &str) -> (PrivilegeStore, nonosh::Session, ScheduleRegistry) {
    let (store, session) = PrivilegeStore::bootstrap(initial_user);
    (store, session, ScheduleRegistry::new())
}

fn load_state(dir: &Path, initial_user: &str) -> Result<(PrivilegeStore, nonosh::Session, ScheduleRegistry), StorageError> {
    let privileges = dir.join(PRIVILEGES_FILE);
    if !privileges.exists() {
        return Ok(fresh_state(initial_user));
    }
    let read = |path: PathBuf| fs::read_to_string(&path).map_err(|source| StorageError::Read { path, source });
    let (store, session) = PrivilegeStore::deserialize(&read(privileges)?);
    let schedules_path = dir.join(SCHEDULES_FILE);
    let schedules = if schedules_path.exists() {
        ScheduleRegistry::deserialize(&read(schedules_path)?)
    } else {
        ScheduleRegistry::new()
    };
    Ok((store, session, schedules))
}

fn save_state(dir: &Path, snapshot: &(String, String)) -> Result<(), StorageError> {
    let write = |name: &str, data: &str| {
        let path = dir.join(name);
        fs::create_dir_all(dir)
            .and_then(|_| fs::write(&path, data))
            .map_err(|source| StorageError::Write { path, source })
    };
    write(PRIVILEGES_FILE, &snapshot.0)?;
    write(SCHEDULES_FILE, &snapshot.1)
}

fn read_plain(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(&['\n', '\r'][..]).to_string()))
}

/// Raw-mode read that echoes one mask character per keystroke.
fn read_secret() -> io::Result<Option<String>> {
    terminal::enable_raw_mode()?;
    let mut secret = String::new();
    let result = loop {
        let ev = match event::read() {
            Ok(ev) => ev,
            Err(err) => break Err(err),
        };
        let Event::Key(key) = ev else { continue };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => break Ok(Some(std::mem::take(&mut secret))),
            KeyCode::Char('d') if ctrl && secret.is_empty() => break Ok(None),
            KeyCode::Backspace => {
                if secret.pop().is_some() {
                    print!("\x08 \x08");
                }
            }
            KeyCode::Char(c) if !ctrl => {
                secret.push(c);
                print!("{}", MASK_CHAR);
            }
            _ => {}
        }
        let _ = io::stdout().flush();
    };
    let _ = terminal::disable_raw_mode();
    print!("\r\n");
    result
}
