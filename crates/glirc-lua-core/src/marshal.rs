//! Conversion of host events into Lua tables, and back for outbound messages.
//!
//! Table shapes seen by scripts:
//!
//! ```text
//! message = { tags = {[string]=string}, network = string,
//!             prefix = { nick = string?, user = string?, host = string? },
//!             command = string, params = {string, ...} }
//! command = { command = string }
//! chat    = { network = string, target = string, message = string }
//! ```
//!
//! Absent prefix parts are absent keys (`nil`), never empty strings.

use crate::event::{Chat, Command, Event, EventName, Message, Prefix};
use mlua::{Lua, MultiValue, Table, Value};
use std::collections::BTreeMap;

/// An event payload that can be handed to a script callback.
pub trait Marshal {
    /// Callback the payload is delivered to.
    fn name(&self) -> EventName;

    /// The single table argument for the callback, if the event carries one.
    fn to_lua<'lua>(&self, lua: &'lua Lua) -> mlua::Result<Option<Table<'lua>>>;
}

impl Marshal for Message {
    fn name(&self) -> EventName {
        EventName::ProcessMessage
    }

    fn to_lua<'lua>(&self, lua: &'lua Lua) -> mlua::Result<Option<Table<'lua>>> {
        message_to_lua(lua, self).map(Some)
    }
}

impl Marshal for Command {
    fn name(&self) -> EventName {
        EventName::ProcessCommand
    }

    fn to_lua<'lua>(&self, lua: &'lua Lua) -> mlua::Result<Option<Table<'lua>>> {
        command_to_lua(lua, self).map(Some)
    }
}

impl Marshal for Chat {
    fn name(&self) -> EventName {
        EventName::ProcessChat
    }

    fn to_lua<'lua>(&self, lua: &'lua Lua) -> mlua::Result<Option<Table<'lua>>> {
        chat_to_lua(lua, self).map(Some)
    }
}

impl Marshal for Event {
    fn name(&self) -> EventName {
        Event::name(self)
    }

    fn to_lua<'lua>(&self, lua: &'lua Lua) -> mlua::Result<Option<Table<'lua>>> {
        match self {
            Self::Message(message) => message.to_lua(lua),
            Self::Command(command) => command.to_lua(lua),
            Self::Chat(chat) => chat.to_lua(lua),
            Self::Stop => Ok(None),
        }
    }
}

/// A fully marshaled, fixed-arity callback invocation.
pub struct CallRequest<'lua> {
    name: EventName,
    argument: Option<Table<'lua>>,
}

impl<'lua> CallRequest<'lua> {
    pub fn build<E: Marshal + ?Sized>(lua: &'lua Lua, event: &E) -> mlua::Result<Self> {
        Ok(Self {
            name: event.name(),
            argument: event.to_lua(lua)?,
        })
    }

    pub fn name(&self) -> EventName {
        self.name
    }

    pub fn argument(&self) -> Option<&Table<'lua>> {
        self.argument.as_ref()
    }

    /// Positional arguments for the call: zero or one table.
    pub fn into_args(self) -> MultiValue<'lua> {
        self.argument.into_iter().map(Value::Table).collect()
    }
}

pub fn message_to_lua<'lua>(lua: &'lua Lua, message: &Message) -> mlua::Result<Table<'lua>> {
    let tags = lua.create_table()?;
    for (key, value) in &message.tags {
        tags.raw_set(key.as_str(), value.as_str())?;
    }

    let table = lua.create_table()?;
    table.raw_set("tags", tags)?;
    table.raw_set("network", message.network.as_str())?;
    table.raw_set("prefix", prefix_to_lua(lua, &message.prefix)?)?;
    table.raw_set("command", message.command.as_str())?;
    table.raw_set(
        "params",
        lua.create_sequence_from(message.params.iter().map(String::as_str))?,
    )?;
    Ok(table)
}

fn prefix_to_lua<'lua>(lua: &'lua Lua, prefix: &Prefix) -> mlua::Result<Table<'lua>> {
    let table = lua.create_table()?;
    table.raw_set("nick", prefix.nick.as_deref())?;
    table.raw_set("user", prefix.user.as_deref())?;
    table.raw_set("host", prefix.host.as_deref())?;
    Ok(table)
}

pub fn command_to_lua<'lua>(lua: &'lua Lua, command: &Command) -> mlua::Result<Table<'lua>> {
    let table = lua.create_table()?;
    table.raw_set("command", command.command.as_str())?;
    Ok(table)
}

pub fn chat_to_lua<'lua>(lua: &'lua Lua, chat: &Chat) -> mlua::Result<Table<'lua>> {
    let table = lua.create_table()?;
    table.raw_set("network", chat.network.as_str())?;
    table.raw_set("target", chat.target.as_str())?;
    table.raw_set("message", chat.message.as_str())?;
    Ok(table)
}

/// Read a script-built message table (as passed to `glirc.send_message`).
///
/// `network` and `command` are required; `tags`, `prefix` and `params`
/// default to empty when missing.
pub fn message_from_lua(table: &Table<'_>) -> mlua::Result<Message> {
    let tags = match table.get::<_, Option<Table>>("tags")? {
        Some(tags) => tags
            .pairs::<String, String>()
            .collect::<mlua::Result<BTreeMap<_, _>>>()?,
        None => BTreeMap::new(),
    };

    let prefix = match table.get::<_, Option<Table>>("prefix")? {
        Some(prefix) => Prefix {
            nick: prefix.get("nick")?,
            user: prefix.get("user")?,
            host: prefix.get("host")?,
        },
        None => Prefix::default(),
    };

    let params = match table.get::<_, Option<Table>>("params")? {
        Some(params) => params
            .sequence_values::<String>()
            .collect::<mlua::Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(Message {
        tags,
        network: table.get("network")?,
        prefix,
        command: table.get("command")?,
        params,
    })
}
