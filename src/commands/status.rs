//! Status and information command handlers: /srvstatus, /help.

use super::CommandContext;
use std::time::Instant;
use warden_core::message::{escape_html, OutgoingMessage};

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn format_uptime(uptime: &Instant) -> String {
    let secs = uptime.elapsed().as_secs();
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// "uid" or "uid/gid" when they differ.
fn process_ids() -> String {
    // SAFETY: getuid/getgid have no preconditions and cannot fail.
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    if uid == gid {
        uid.to_string()
    } else {
        format!("{uid}/{gid}")
    }
}

pub(super) fn handle_srvstatus(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let session = ctx.access.session.snapshot();
    let mut content = String::new();

    if let Some(ref editor) = session.editor {
        content.push_str(&format!("Editing file: {}\n\n", escape_html(&editor.label)));
    } else if let Some(ref command) = session.command {
        match command.pid {
            Some(pid) => content.push_str(&format!("Command running, PID {pid}.\n\n")),
            None => content.push_str("Command running.\n\n"),
        }
    } else {
        content.push_str("No command running.\n\n");
    }

    content.push_str(&format!("Shell: {}\n", escape_html(&session.shell)));
    content.push_str(&format!(
        "Size: {}x{}\n",
        session.size.columns, session.size.rows
    ));
    content.push_str(&format!(
        "Directory: {}\n",
        escape_html(&session.cwd.to_string_lossy())
    ));
    content.push_str(&format!("Silent: {}\n", yes_no(session.silent)));
    content.push_str(&format!(
        "Shell interactive: {}\n",
        yes_no(session.interactive)
    ));
    content.push_str(&format!(
        "Link previews: {}\n",
        yes_no(session.link_previews)
    ));
    content.push_str(&format!("UID/GID: {}\n", process_ids()));
    content.push_str(&format!("Uptime: {}\n", format_uptime(ctx.uptime)));

    // Keyed on the chat, not the context: a granted sender in a foreign
    // group does not get the list.
    if let Ok(granted) = ctx.gate.granted(ctx.chat()) {
        if granted.is_empty() {
            content.push_str(
                "\nNo chats granted. Use /grant or /token to allow another chat to use the bot.",
            );
        } else {
            content.push_str("\nGranted chats:\n");
            let ids: Vec<String> = granted.iter().map(i64::to_string).collect();
            content.push_str(&ids.join("\n"));
        }
    }

    let reply = ctx.reply_html(content);
    match session.command.and_then(|c| c.message_id) {
        Some(id) => reply.replying_to(id),
        None => reply,
    }
}

pub(super) fn handle_help(ctx: &CommandContext<'_>) -> OutgoingMessage {
    let mut content = String::from(
        "Development Mode /on\n\
         Development Mode /off\n\
         Cache - Purge /everything\n\
         Development Mode /status\n\
         \n\
         /srvstatus - session and host status\n\
         /cd &lt;dir&gt; - change directory\n\
         /resize &lt;columns&gt; &lt;rows&gt; - terminal size\n\
         /setshell [shell] - choose the shell\n\
         /setsilent [yes|no] - silent output\n\
         /setinteractive [yes|no] - interactive shell\n\
         /linkpreviews [yes|no] - link previews\n",
    );
    if ctx.gate.is_owner_key(ctx.access.context_key) {
        content.push_str(
            "\n/token - one-time access link\n\
             /grant &lt;id&gt; - allow a chat\n\
             /revoke &lt;id&gt; - revoke a chat\n",
        );
    }
    ctx.reply_html(content)
}
