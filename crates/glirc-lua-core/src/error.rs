//! Error types for glirc-lua-core

use thiserror::Error;

/// Why an extension failed to load.
///
/// Every variant owns its message text, so the interpreter that produced it
/// can be released before or after the error is displayed.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// The interpreter could not be created on this platform.
    #[error("Failed to allocate Lua interpreter: {0}")]
    Interpreter(String),

    /// Missing file, syntax error, or an error raised by the script body.
    #[error("{0}")]
    Script(String),

    /// The script ran but did not return a callback table.
    #[error("{path}: extension script returned {type_name}, expected a table of callbacks")]
    NotATable {
        path: String,
        type_name: &'static str,
    },

    /// The host's library installer failed.
    #[error("Failed to install glirc library: {0}")]
    Bindings(String),
}

/// Misuse of the start/stop lifecycle.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("extension is already running")]
    AlreadyStarted,

    #[error("extension has been stopped")]
    Stopped,

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

/// Text of an interpreter error as shown to the user.
///
/// Lua-raised messages are reported verbatim, minus any traceback the
/// interpreter appended; errors from Rust callbacks report their innermost
/// cause.
pub fn error_message(err: &mlua::Error) -> String {
    match err {
        mlua::Error::RuntimeError(msg) | mlua::Error::MemoryError(msg) => {
            strip_traceback(msg).to_string()
        }
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::CallbackError { cause, .. } => error_message(cause),
        other => other.to_string(),
    }
}

fn strip_traceback(msg: &str) -> &str {
    msg.split_once("\nstack traceback:")
        .map_or(msg, |(head, _)| head)
}
