//! Shared utilities for channel implementations.

/// How a body is interpreted by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    Plain,
    /// Entities (`&amp;`) and tags (`<b>`) must not be cut in half.
    Html,
}

/// Split a long body into chunks of at most `max_len` bytes.
///
/// Cuts land on UTF-8 char boundaries and prefer the last newline inside the
/// window. For HTML bodies a cut is pulled back before any entity or tag it
/// would otherwise break.
pub fn split_message(text: &str, max_len: usize, markup: Markup) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_len {
        let mut end = max_len;
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let mut cut = rest[..end].rfind('\n').map_or(end, |i| i + 1);
        if markup == Markup::Html {
            cut = before_open_markup(&rest[..cut]);
        }
        // Nothing safe in the window: cut hard rather than loop forever.
        if cut == 0 {
            cut = end.max(rest.chars().next().map_or(1, char::len_utf8));
        }
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Length of `head` with any trailing unterminated entity or tag removed.
fn before_open_markup(head: &str) -> usize {
    let open = |start: char, close: char| {
        head.rfind(start)
            .filter(|&i| !head[i..].contains(close))
    };
    match (open('&', ';'), open('<', '>')) {
        (Some(a), Some(b)) => a.min(b),
        (Some(i), None) | (None, Some(i)) => i,
        (None, None) => head.len(),
    }
}
