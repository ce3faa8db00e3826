//! Protected invocation of script callbacks.
//!
//! Each dispatch looks the callback up and calls it inside one failure
//! domain: a misbehaving callback table (say, an `__index` metamethod that
//! raises) is handled exactly like a callback that raises. Errors are
//! reported to the host and resolve to `PassMessage`; they never end the
//! instance.

use crate::bootstrap::ExtensionInstance;
use crate::error::error_message;
use crate::event::{Chat, Command, EventName, Message, ProcessResult};
use crate::host::MessageCode;
use crate::marshal::{CallRequest, Marshal};
use mlua::{Function, Lua, MultiValue, Table, Value};

/// What happened when a callback was dispatched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The script defines no callback under this name.
    Missing,
    /// The callback returned; `truthy` is its first result under [`is_truthy`].
    Returned { truthy: bool },
    /// The lookup or the call raised; the message was reported to the host.
    Failed(String),
}

impl CallOutcome {
    /// Host decision for decision-bearing events.
    pub fn decision(&self) -> ProcessResult {
        match self {
            Self::Returned { truthy } => ProcessResult::from_drop(*truthy),
            Self::Missing | Self::Failed(_) => ProcessResult::PassMessage,
        }
    }
}

/// Boolean coercion applied to callback results: `nil` and `false` are false,
/// every other value (including `0` and `""`) is true.
pub fn is_truthy(value: &Value<'_>) -> bool {
    !matches!(value, Value::Nil | Value::Boolean(false))
}

/// Functions, and tables whose metatable has a `__call` field.
pub fn is_callable(value: &Value<'_>) -> bool {
    match value {
        Value::Function(_) => true,
        Value::Table(table) => table
            .get_metatable()
            .and_then(|meta| meta.raw_get::<_, Value>("__call").ok())
            .is_some_and(|call| !call.is_nil()),
        _ => false,
    }
}

/// Chunk that calls its first argument with the rest, so non-function
/// callbacks get Lua's own call semantics (`__call`, and the usual
/// "attempt to call" error naming the callback).
fn call_through_lua(lua: &Lua, name: EventName) -> mlua::Result<Function<'_>> {
    lua.load(format!(
        "local {name} = ...\nlocal result = {name}(select(2, ...))\nreturn result"
    ))
    .set_name("=glirc")
    .into_function()
}

impl ExtensionInstance {
    /// Deliver `event` to its callback, if the script defines one.
    pub fn dispatch<E: Marshal + ?Sized>(&self, event: &E) -> CallOutcome {
        let name = event.name();
        let span = tracing::debug_span!("lua_dispatch", event = %name);
        let _guard = span.enter();

        match self.protected_call(event) {
            Ok(None) => CallOutcome::Missing,
            Ok(Some(truthy)) => {
                tracing::trace!(truthy, "lua callback returned");
                CallOutcome::Returned { truthy }
            }
            Err(err) => {
                let message = error_message(&err);
                tracing::warn!(event = %name, error = %message, "lua callback failed");
                self.host.report(MessageCode::Error, &message);
                CallOutcome::Failed(message)
            }
        }
    }

    /// Lookup, marshaling and call; any error inside surfaces as one `Err`.
    fn protected_call<E: Marshal + ?Sized>(&self, event: &E) -> mlua::Result<Option<bool>> {
        let lua = &self.lua;
        let name = event.name();

        let callbacks: Table = lua.registry_value(&self.callbacks)?;
        let callback = callbacks.get::<_, Value>(name.as_str())?;
        if callback.is_nil() {
            return Ok(None);
        }

        let request = CallRequest::build(lua, event)?;
        let result: Value = match callback {
            Value::Function(callback) => callback.call(request.into_args())?,
            other => {
                let args: MultiValue = std::iter::once(other).chain(request.into_args()).collect();
                call_through_lua(lua, name)?.call(args)?
            }
        };
        Ok(Some(is_truthy(&result)))
    }

    /// Whether the script's table holds a callable value under `name`.
    pub fn has_callback(&self, name: EventName) -> bool {
        self.lua
            .registry_value::<Table>(&self.callbacks)
            .and_then(|callbacks| callbacks.get::<_, Value>(name.as_str()))
            .is_ok_and(|value| is_callable(&value))
    }

    pub fn process_message(&self, message: &Message) -> ProcessResult {
        self.dispatch(message).decision()
    }

    pub fn process_command(&self, command: &Command) {
        self.dispatch(command);
    }

    pub fn process_chat(&self, chat: &Chat) -> ProcessResult {
        self.dispatch(chat).decision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::event::{Event, Prefix};
    use crate::host::HostToken;
    use crate::host::testing::RecordingHost;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn instance(body: &str) -> (ExtensionInstance, Arc<RecordingHost>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("glirc.lua");
        std::fs::write(&path, body).unwrap();
        let host = RecordingHost::shared();
        let token: HostToken = host.clone();
        let instance = ExtensionInstance::start(
            token,
            &dir.path().join("libglirc-lua.so").to_string_lossy(),
            &[],
            &BridgeConfig::default(),
        )
        .unwrap();
        (instance, host, dir)
    }

    fn chat() -> Chat {
        Chat {
            network: "libera".to_string(),
            target: "#rust".to_string(),
            message: "hello".to_string(),
        }
    }

    #[test]
    fn lua_truthiness_policy() {
        let lua = Lua::new();
        assert!(!is_truthy(&Value::Nil));
        assert!(!is_truthy(&Value::Boolean(false)));
        assert!(is_truthy(&Value::Boolean(true)));
        assert!(is_truthy(&Value::Integer(0)));
        assert!(is_truthy(&Value::Number(0.0)));
        assert!(is_truthy(&Value::String(lua.create_string("").unwrap())));
        assert!(is_truthy(&Value::Table(lua.create_table().unwrap())));
    }

    #[test]
    fn missing_callback_passes_silently() {
        let (instance, host, _dir) = instance(
            r#"
            calls = 0
            return { process_command = function() calls = calls + 1 end }
            "#,
        );

        assert_eq!(instance.dispatch(&chat()), CallOutcome::Missing);
        assert_eq!(instance.process_chat(&chat()), ProcessResult::PassMessage);
        assert!(host.reports().is_empty());
        let calls: i64 = instance.lua.globals().get("calls").unwrap();
        assert_eq!(calls, 0);
    }

    #[test]
    fn truthy_results_drop_and_falsy_results_pass() {
        let cases = [
            ("true", ProcessResult::DropMessage),
            ("0", ProcessResult::DropMessage),
            ("''", ProcessResult::DropMessage),
            ("false", ProcessResult::PassMessage),
            ("nil", ProcessResult::PassMessage),
        ];

        for (ret, expected) in cases {
            let (instance, _host, _dir) =
                instance(&format!("return {{ process_chat = function() return {ret} end }}"));
            assert_eq!(instance.process_chat(&chat()), expected, "return {ret}");
        }
    }

    #[test]
    fn callback_without_return_value_passes() {
        let (instance, _host, _dir) = instance("return { process_message = function() end }");
        assert_eq!(
            instance.dispatch(&Message::default()),
            CallOutcome::Returned { truthy: false }
        );
    }

    #[test]
    fn raised_error_is_reported_once_and_instance_survives() {
        let (instance, host, _dir) = instance(
            r#"
            local n = 0
            return {
              process_chat = function(chat)
                n = n + 1
                if n == 1 then error("boom") end
                return true
              end,
            }
            "#,
        );

        let first = instance.dispatch(&chat());
        assert!(matches!(&first, CallOutcome::Failed(msg) if msg.contains("boom")));
        assert_eq!(first.decision(), ProcessResult::PassMessage);
        assert_eq!(host.errors().len(), 1);

        assert_eq!(instance.process_chat(&chat()), ProcessResult::DropMessage);
        assert_eq!(host.errors().len(), 1);
    }

    #[test]
    fn non_string_error_values_are_coerced_to_text() {
        let (instance, host, _dir) =
            instance("return { process_command = function() error({ code = 7 }) end }");

        instance.process_command(&Command {
            command: "x".to_string(),
        });
        let errors = host.errors();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_empty());
    }

    #[test]
    fn non_function_callback_is_an_isolated_error() {
        let (instance, host, _dir) = instance("return { process_message = 42 }");
        assert_eq!(
            instance.process_message(&Message::default()),
            ProcessResult::PassMessage
        );
        let errors = host.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("attempt to call a number value"), "{}", errors[0]);
        assert!(errors[0].contains("process_message"), "{}", errors[0]);
    }

    #[test]
    fn callable_table_is_a_callback() {
        let (instance, host, _dir) = instance(
            r#"
            local filter = setmetatable({ seen = 0 }, {
              __call = function(self, chat)
                self.seen = self.seen + 1
                return chat.message == "hello"
              end,
            })
            return { process_chat = filter }
            "#,
        );

        assert!(instance.has_callback(EventName::ProcessChat));
        assert_eq!(instance.process_chat(&chat()), ProcessResult::DropMessage);
        let mut quiet = chat();
        quiet.message = "bye".to_string();
        assert_eq!(instance.process_chat(&quiet), ProcessResult::PassMessage);
        assert!(host.reports().is_empty());
    }

    #[test]
    fn callable_table_stop_receives_no_arguments() {
        let (instance, host, _dir) = instance(
            r#"
            return {
              stop = setmetatable({}, {
                __call = function(_, ...) glirc.print(tostring(select('#', ...))) end,
              }),
            }
            "#,
        );
        assert_eq!(
            instance.dispatch(&Event::Stop),
            CallOutcome::Returned { truthy: false }
        );
        assert_eq!(host.reports(), vec![(MessageCode::Normal, "0".to_string())]);
    }

    #[test]
    fn callable_check_looks_at_call_metamethod() {
        let lua = Lua::new();
        let plain: Value = lua.load("return {}").eval().unwrap();
        let callable: Value = lua
            .load("return setmetatable({}, { __call = function() end })")
            .eval()
            .unwrap();
        let function: Value = lua.load("return print").eval().unwrap();
        assert!(!is_callable(&plain));
        assert!(is_callable(&callable));
        assert!(is_callable(&function));
        assert!(!is_callable(&Value::Integer(1)));
    }

    #[test]
    fn raising_index_metamethod_is_contained() {
        let (instance, host, _dir) = instance(
            r#"
            return setmetatable({}, { __index = function(_, key) error("no " .. key) end })
            "#,
        );
        assert_eq!(instance.process_chat(&chat()), ProcessResult::PassMessage);
        let errors = host.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("no process_chat"), "{}", errors[0]);
    }

    #[test]
    fn message_fields_reach_the_callback_unchanged() {
        let (instance, host, _dir) = instance(
            r#"
            local function keys(t)
              local out = {}
              for k in pairs(t) do out[#out + 1] = k end
              table.sort(out)
              return table.concat(out, ",")
            end
            return {
              process_message = function(msg)
                glirc.print(keys(msg))
                glirc.print(keys(msg.tags) .. "=" .. msg.tags.time)
                glirc.print(msg.network .. " " .. msg.command)
                glirc.print(keys(msg.prefix) .. "=" .. msg.prefix.nick)
                glirc.print(#msg.params .. ":" .. msg.params[1] .. ":" .. msg.params[2])
              end,
            }
            "#,
        );

        let message = Message {
            tags: BTreeMap::from([("time".to_string(), "123".to_string())]),
            network: "freenode".to_string(),
            prefix: Prefix::nick("alice"),
            command: "PRIVMSG".to_string(),
            params: vec!["#chan".to_string(), "hi".to_string()],
        };
        assert_eq!(instance.process_message(&message), ProcessResult::PassMessage);

        let printed: Vec<String> = host.reports().into_iter().map(|(_, m)| m).collect();
        assert_eq!(
            printed,
            vec![
                "command,network,params,prefix,tags",
                "time=123",
                "freenode PRIVMSG",
                "nick=alice",
                "2:#chan:hi",
            ]
        );
    }

    #[test]
    fn stop_callback_receives_no_arguments() {
        let (instance, host, _dir) =
            instance("return { stop = function(...) glirc.print(tostring(select('#', ...))) end }");
        assert_eq!(
            instance.dispatch(&Event::Stop),
            CallOutcome::Returned { truthy: false }
        );
        assert_eq!(host.reports(), vec![(MessageCode::Normal, "0".to_string())]);
    }

    #[test]
    fn has_callback_reflects_table_contents() {
        let (instance, _host, _dir) =
            instance("return { process_chat = function() end, stop = true }");
        assert!(instance.has_callback(EventName::ProcessChat));
        assert!(!instance.has_callback(EventName::Stop));
        assert!(!instance.has_callback(EventName::ProcessMessage));
    }
}
