// src/shell/prompt.rs — Prompt rendering

/// `user@host:path# ` for root, `user@host:path$ ` for everyone else.
pub fn render_prompt(username: &str, is_root: bool, host: &str, cwd: &str, home: &str) -> String {
    let marker = if is_root { '#' } else { '$' };
    format!("{}@{}:{}{} ", username, host, abbreviate_home(cwd, home), marker)
}

/// Replace a leading `home` with `~`. `/home/adm2` is not under `/home/adm`.
pub fn abbreviate_home(cwd: &str, home: &str) -> String {
    let home = home.trim_end_matches('/');
    if home.is_empty() {
        return cwd.to_string();
    }
    if cwd == home {
        return "~".to_string();
    }
    match cwd.strip_prefix(home) {
        Some(rest) if rest.starts_with('/') => format!("~{}", rest),
        _ => cwd.to_string(),
    }
}
