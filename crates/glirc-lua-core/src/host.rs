//! Services the host client provides to the bridge.

use crate::bindings;
use crate::event::Message;
use mlua::{Lua, Table};
use std::sync::Arc;

/// Severity accepted by the host's diagnostic sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageCode {
    Normal,
    Error,
}

/// The host side of the extension interface.
///
/// One host value is shared by every interpreter it starts; calls into a
/// single interpreter are serialized by the host, but separate extensions may
/// live on separate threads, hence `Send + Sync`.
pub trait Host: Send + Sync + 'static {
    /// Display a diagnostic line to the user.
    fn report(&self, code: MessageCode, message: &str);

    /// Turn a user-supplied path into an absolute one.
    fn resolve_path(&self, raw: &str) -> String;

    /// Queue an outbound IRC message.
    fn send_message(&self, message: &Message) -> Result<(), String> {
        let _ = message;
        Err("sending messages is not supported by this host".to_string())
    }

    /// Populate the interpreter's global namespace with host functions.
    ///
    /// Called exactly once per bootstrap, before the user script runs.
    fn install_bindings<'lua>(&self, lua: &'lua Lua, globals: &Table<'lua>) -> mlua::Result<()> {
        bindings::install(lua, globals)
    }
}

/// Reference back into host state, fixed for an instance's lifetime.
pub type HostToken = Arc<dyn Host>;

/// App-data slot holding the host token inside an interpreter.
struct HostSlot(HostToken);

pub(crate) fn attach_host(lua: &Lua, host: &HostToken) {
    lua.set_app_data(HostSlot(Arc::clone(host)));
}

/// Fetch the host token stored in `lua`, for re-entry from script functions.
pub fn host_from_lua(lua: &Lua) -> mlua::Result<HostToken> {
    lua.app_data_ref::<HostSlot>()
        .map(|slot| Arc::clone(&slot.0))
        .ok_or_else(|| mlua::Error::RuntimeError("no glirc host attached to interpreter".into()))
}
