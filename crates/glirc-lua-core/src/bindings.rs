//! The `glirc` library exposed to extension scripts.
//!
//! ```lua
//! glirc.print("loaded")                      -- normal client message
//! glirc.error("bad config")                  -- error client message
//! local path = glirc.resolve_path("~/x.txt")
//! glirc.send_message { network = "libera", command = "PRIVMSG",
//!                      params = { "#chan", "hi" } }
//! print(glirc.version.major, glirc.version.minor)
//! ```

use crate::host::{MessageCode, host_from_lua};
use crate::marshal::message_from_lua;
use crate::{API_MAJOR_VERSION, API_MINOR_VERSION};
use mlua::{Lua, Table};

/// Install the `glirc` table into `globals`.
pub fn install<'lua>(lua: &'lua Lua, globals: &Table<'lua>) -> mlua::Result<()> {
    let glirc = lua.create_table()?;

    glirc.set(
        "print",
        lua.create_function(|lua, text: String| report(lua, MessageCode::Normal, &text))?,
    )?;
    glirc.set(
        "error",
        lua.create_function(|lua, text: String| report(lua, MessageCode::Error, &text))?,
    )?;
    glirc.set(
        "resolve_path",
        lua.create_function(|lua, path: String| Ok(host_from_lua(lua)?.resolve_path(&path)))?,
    )?;
    glirc.set(
        "send_message",
        lua.create_function(|lua, table: Table| {
            let message = message_from_lua(&table)?;
            host_from_lua(lua)?
                .send_message(&message)
                .map_err(mlua::Error::RuntimeError)
        })?,
    )?;

    let version = lua.create_table()?;
    version.set("major", API_MAJOR_VERSION)?;
    version.set("minor", API_MINOR_VERSION)?;
    glirc.set("version", version)?;

    globals.set("glirc", glirc)
}

fn report(lua: &Lua, code: MessageCode, text: &str) -> mlua::Result<()> {
    host_from_lua(lua)?.report(code, text);
    Ok(())
}
