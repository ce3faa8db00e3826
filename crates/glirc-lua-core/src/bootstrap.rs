//! Interpreter creation and script loading.
//!
//! A bootstrap either yields a running [`ExtensionInstance`] holding the
//! script's callback table, or reports exactly one diagnostic to the host and
//! releases the interpreter.
//!
//! Scripts get mlua's safe standard library set. Unlike a stock `lua`
//! interpreter there is no `debug` library: mlua only opens it through
//! `Lua::unsafe_new_with`, and this crate forbids `unsafe`.

use crate::config::BridgeConfig;
use crate::error::{BootstrapError, error_message};
use crate::host::{Host, HostToken, MessageCode, attach_host};
use mlua::{Lua, LuaOptions, RegistryKey, StdLib, Value};
use std::path::Path;

/// One running interpreter plus the callback table its script returned.
///
/// Owned exclusively by one loaded extension. Dropping it (or calling
/// [`ExtensionInstance::stop`]) closes the interpreter.
pub struct ExtensionInstance {
    pub(crate) lua: Lua,
    pub(crate) callbacks: RegistryKey,
    pub(crate) host: HostToken,
    pub(crate) script_path: String,
}

impl std::fmt::Debug for ExtensionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionInstance")
            .field("script_path", &self.script_path)
            .finish_non_exhaustive()
    }
}

impl ExtensionInstance {
    /// Create an interpreter and run the extension script.
    ///
    /// `library_path` is the path of the extension library the host loaded;
    /// with no `args` the script is looked up next to it. Otherwise
    /// `args[0]` names the script and the rest are exposed through `arg`.
    ///
    /// On failure the error has already been reported to the host.
    pub fn start(
        host: HostToken,
        library_path: &str,
        args: &[String],
        config: &BridgeConfig,
    ) -> Result<Self, BootstrapError> {
        let lua = match Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default()) {
            Ok(lua) => lua,
            Err(err) => {
                let err = BootstrapError::Interpreter(error_message(&err));
                fail(&host, &err);
                return Err(err);
            }
        };

        let script_path =
            resolve_script_path(host.as_ref(), library_path, args, &config.default_script);

        match initialize(&lua, &host, &script_path, args) {
            Ok(callbacks) => {
                tracing::info!(script = %script_path, "lua extension started");
                Ok(Self {
                    lua,
                    callbacks,
                    host,
                    script_path,
                })
            }
            Err(err) => {
                fail(&host, &err);
                // Only close the interpreter once the diagnostic is out.
                drop(lua);
                Err(err)
            }
        }
    }

    /// Path of the script this instance was loaded from.
    pub fn script_path(&self) -> &str {
        &self.script_path
    }

    pub fn host(&self) -> &HostToken {
        &self.host
    }
}

fn fail(host: &HostToken, err: &BootstrapError) {
    let message = err.to_string();
    tracing::warn!(error = %message, "lua extension failed to start");
    host.report(MessageCode::Error, &message);
}

/// Pick the script to run.
///
/// Without arguments, `default_script` in the directory of `library_path`;
/// otherwise the first argument as resolved by the host.
pub fn resolve_script_path(
    host: &dyn Host,
    library_path: &str,
    args: &[String],
    default_script: &str,
) -> String {
    match args.first() {
        Some(script) => host.resolve_path(script),
        None => {
            let dir = match Path::new(library_path).parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            dir.join(default_script).to_string_lossy().into_owned()
        }
    }
}

/// Everything that may fail after the interpreter exists.
fn initialize(
    lua: &Lua,
    host: &HostToken,
    script_path: &str,
    args: &[String],
) -> Result<RegistryKey, BootstrapError> {
    attach_host(lua, host);

    host.install_bindings(lua, &lua.globals())
        .map_err(|err| BootstrapError::Bindings(error_message(&err)))?;

    let extra_args = args.get(1..).unwrap_or_default();
    let module = run_script(lua, script_path, extra_args)
        .map_err(|err| BootstrapError::Script(error_message(&err)))?;

    match module {
        Value::Table(table) => lua
            .create_registry_value(table)
            .map_err(|err| BootstrapError::Script(error_message(&err))),
        other => Err(BootstrapError::NotATable {
            path: script_path.to_string(),
            type_name: other.type_name(),
        }),
    }
}

/// Load and run the script, returning its first result.
///
/// A missing file, a syntax error and an error raised by the script body all
/// come back as one `mlua::Error`.
fn run_script<'lua>(
    lua: &'lua Lua,
    script_path: &str,
    extra_args: &[String],
) -> mlua::Result<Value<'lua>> {
    let source = std::fs::read(script_path).map_err(|err| {
        mlua::Error::RuntimeError(format!("cannot open {script_path}: {err}"))
    })?;
    let source = strip_script_header(source);
    let chunk = lua
        .load(source)
        .set_name(format!("@{script_path}"))
        .into_function()?;

    let arg = lua.create_sequence_from(extra_args.iter().map(String::as_str))?;
    arg.raw_set(0, script_path)?;
    lua.globals().set("arg", arg.clone())?;

    chunk.call((arg, script_path))
}

/// Drop a leading UTF-8 byte-order mark, then blank out a first line
/// starting with `#` (a shebang). The newline stays so line numbers in
/// error messages still match the file.
fn strip_script_header(mut source: Vec<u8>) -> Vec<u8> {
    if source.starts_with(b"\xEF\xBB\xBF") {
        source.drain(..3);
    }
    if source.first() == Some(&b'#') {
        let end = source
            .iter()
            .position(|&byte| byte == b'\n')
            .unwrap_or(source.len());
        source.drain(..end);
    }
    source
}
