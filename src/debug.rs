//! Debug logging
//!
//! Diagnostics logging switched on by the global `--debug` flag or
//! `BRIDGEBUILD_DEBUG`. Disabled logging costs one atomic load.

use std::process::Command;
use std::sync::OnceLock;

static DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

/// Initialize debug mode; later calls are ignored.
pub fn init_debug(enabled: bool) {
    let _ = DEBUG_ENABLED.set(enabled || crate::env_vars::debug());
}

/// Check if debug mode is enabled
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.get().copied().unwrap_or(false)
}

/// Print a debug message if debug mode is enabled
pub fn debug_log(message: &str) {
    if is_debug_enabled() {
        eprintln!("[DEBUG] {message}");
    }
}

/// Echo an external tool invocation, shell-style.
pub fn log_command(cmd: &Command) {
    if is_debug_enabled() {
        eprintln!("[DEBUG] running: {}", render_command(cmd));
    }
}

/// Render a command line for display. Arguments with spaces are quoted.
pub fn render_command(cmd: &Command) -> String {
    let mut parts = vec![quote(&cmd.get_program().to_string_lossy())];
    parts.extend(cmd.get_args().map(|arg| quote(&arg.to_string_lossy())));
    let line = parts.join(" ");

    match cmd.get_current_dir() {
        Some(dir) => format!("(cd {} && {line})", quote(&dir.to_string_lossy())),
        None => line,
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("'{arg}'")
    } else {
        arg.to_string()
    }
}

/// Macro for convenient debug logging
///
/// Usage: `debug!("resolved {} to {}", name, path.display())`
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        if $crate::debug::is_debug_enabled() {
            eprintln!("[DEBUG] {}", format_args!($($arg)*));
        }
    };
}
