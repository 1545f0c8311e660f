//! Session settings handlers: /cd, /resize, /setshell, /setsilent,
//! /setinteractive, /linkpreviews.

use super::CommandContext;
use std::path::{Path, PathBuf};
use tracing::info;
use warden_auth::TerminalSize;
use warden_core::config::shellexpand;
use warden_core::message::{escape_html, OutgoingMessage};

const MAX_DIMENSION: u16 = 1000;

/// Parse a yes/no argument; no argument flips `current`.
fn parse_toggle(arg: Option<&str>, current: bool) -> Option<bool> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        None => Some(!current),
        Some("yes" | "on" | "true" | "1") => Some(true),
        Some("no" | "off" | "false" | "0") => Some(false),
        Some(_) => None,
    }
}

/// Resolve `arg` against `cwd`, expanding `~`.
fn resolve_dir(cwd: &Path, arg: &str) -> PathBuf {
    let expanded = if arg == "~" {
        std::env::var("HOME").unwrap_or_else(|_| arg.to_string())
    } else {
        shellexpand(arg)
    };
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

fn parse_size(arg: &str) -> Option<TerminalSize> {
    let mut parts = arg.split(|c: char| c.is_whitespace() || c == 'x').filter(|p| !p.is_empty());
    let columns: u16 = parts.next()?.parse().ok()?;
    let rows: u16 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    let valid = |n: u16| (1..=MAX_DIMENSION).contains(&n);
    (valid(columns) && valid(rows)).then_some(TerminalSize { columns, rows })
}

pub(super) fn handle_cd(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let mut session = ctx.access.session.lock();
    let Some(arg) = ctx.args() else {
        return ctx.reply_html(format!(
            "Current directory: {}",
            escape_html(&session.cwd.to_string_lossy())
        ));
    };
    if session.command.is_some() {
        return ctx.reply_html("Can't change directory while a command is running.");
    }

    let target = resolve_dir(&session.cwd, arg);
    match std::fs::canonicalize(&target) {
        Ok(dir) if dir.is_dir() => {
            info!("context {} changed directory to {}", session.key, dir.display());
            let reply = format!("Now at: {}", escape_html(&dir.to_string_lossy()));
            session.cwd = dir;
            ctx.reply_html(reply)
        }
        Ok(_) => ctx.reply_html(format!(
            "Not a directory: {}",
            escape_html(&target.to_string_lossy())
        )),
        Err(e) => ctx.reply_html(format!(
            "Couldn't change directory: {}",
            escape_html(&e.to_string())
        )),
    }
}

pub(super) fn handle_resize(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let Some(size) = ctx.args().and_then(parse_size) else {
        return ctx.reply_html(format!(
            "Use /resize &lt;columns&gt; &lt;rows&gt; (each between 1 and {MAX_DIMENSION})."
        ));
    };
    ctx.access.session.lock().size = size;
    ctx.reply_html(format!(
        "Terminal resized to {}x{}.",
        size.columns, size.rows
    ))
}

pub(super) fn handle_setshell(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let shells = ctx.gate.available_shells();
    let mut session = ctx.access.session.lock();

    let Some(arg) = ctx.first_arg() else {
        let list: Vec<String> = shells
            .iter()
            .map(|s| {
                let marker = if *s == session.shell { " (current)" } else { "" };
                format!("{}{marker}", escape_html(s))
            })
            .collect();
        return ctx.reply_html(format!(
            "Available shells:\n{}\n\nUse /setshell &lt;shell&gt; to switch.",
            list.join("\n")
        ));
    };

    if session.command.is_some() {
        return ctx.reply_html("Can't change the shell while a command is running.");
    }
    if !shells.iter().any(|s| s == arg) {
        return ctx.reply_html(format!("Unknown shell: {}", escape_html(arg)));
    }
    session.shell = arg.to_string();
    ctx.reply_html(format!("Shell changed to {}.", escape_html(arg)))
}

pub(super) fn handle_setsilent(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let mut session = ctx.access.session.lock();
    let Some(silent) = parse_toggle(ctx.first_arg(), session.silent) else {
        return ctx.reply_html("Use /setsilent [yes|no].");
    };
    session.silent = silent;
    if silent {
        ctx.reply_html("Output will be sent silently.")
    } else {
        ctx.reply_html("Output will make a notification.")
    }
}

pub(super) fn handle_setinteractive(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let mut session = ctx.access.session.lock();
    let Some(interactive) = parse_toggle(ctx.first_arg(), session.interactive) else {
        return ctx.reply_html("Use /setinteractive [yes|no].");
    };
    session.interactive = interactive;
    if interactive {
        ctx.reply_html("Commands will be started with an interactive shell.")
    } else {
        ctx.reply_html("Commands will be started with a non-interactive shell.")
    }
}

pub(super) fn handle_linkpreviews(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let mut session = ctx.access.session.lock();
    let Some(previews) = parse_toggle(ctx.first_arg(), session.link_previews) else {
        return ctx.reply_html("Use /linkpreviews [yes|no].");
    };
    session.link_previews = previews;
    if previews {
        ctx.reply_html("Link previews enabled.")
    } else {
        ctx.reply_html("Link previews disabled.")
    }
}
