//! Shared utilities

use std::io;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// A line typed at the prompt, or why there is none
#[derive(Debug, PartialEq)]
pub enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Wait for the next line from `read` unless `interrupt` fires first
pub async fn next_input(
    read: impl Future<Output = io::Result<Option<String>>>,
    interrupt: impl Future<Output = ()>,
) -> io::Result<Input> {
    tokio::select! {
        line = read => Ok(line?.map_or(Input::Eof, Input::Line)),
        () = interrupt => Ok(Input::Interrupted),
    }
}

/// Read one line from stdin on the blocking pool. `None` on EOF.
pub async fn read_stdin_line() -> io::Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match io::stdin().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line)),
        }
    })
    .await
    .map_err(io::Error::other)?
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
pub async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
