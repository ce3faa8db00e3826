//! Host event payloads delivered to extension scripts.
//!
//! The host hands the bridge one of four event shapes. Each maps to a fixed
//! field name in the script's callback table (see [`EventName`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sender information attached to an IRC message.
///
/// Every part is optional; an absent part is never the same as an empty one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefix {
    pub nick: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
}

impl Prefix {
    /// Prefix carrying only a nickname.
    pub fn nick(nick: impl Into<String>) -> Self {
        Self {
            nick: Some(nick.into()),
            ..Self::default()
        }
    }
}

/// An IRC message received from (or sent to) a network.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// IRCv3 message tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub network: String,
    #[serde(default)]
    pub prefix: Prefix,
    pub command: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Text following the client's `/extension` command.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
}

/// A chat line the user is about to send.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub network: String,
    /// Window (channel or query) name.
    pub target: String,
    pub message: String,
}

/// Any event the host can deliver to an extension.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Message(Message),
    Command(Command),
    Chat(Chat),
    Stop,
}

impl Event {
    pub fn name(&self) -> EventName {
        match self {
            Self::Message(_) => EventName::ProcessMessage,
            Self::Command(_) => EventName::ProcessCommand,
            Self::Chat(_) => EventName::ProcessChat,
            Self::Stop => EventName::Stop,
        }
    }
}

/// Closed set of callback names a script may define.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventName {
    ProcessMessage,
    ProcessCommand,
    ProcessChat,
    Stop,
}

impl EventName {
    pub const ALL: [Self; 4] = [
        Self::ProcessMessage,
        Self::ProcessCommand,
        Self::ProcessChat,
        Self::Stop,
    ];

    /// Field name looked up in the callback table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProcessMessage => "process_message",
            Self::ProcessCommand => "process_command",
            Self::ProcessChat => "process_chat",
            Self::Stop => "stop",
        }
    }

    /// Whether the host acts on the callback's return value.
    pub const fn is_decision_bearing(self) -> bool {
        matches!(self, Self::ProcessMessage | Self::ProcessChat)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision returned to the host for message and chat events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessResult {
    /// Continue normal processing.
    #[default]
    PassMessage,
    /// Suppress the event.
    DropMessage,
}

impl ProcessResult {
    pub const fn from_drop(drop: bool) -> Self {
        if drop {
            Self::DropMessage
        } else {
            Self::PassMessage
        }
    }

    pub const fn is_drop(self) -> bool {
        matches!(self, Self::DropMessage)
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PassMessage => f.write_str("pass"),
            Self::DropMessage => f.write_str("drop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_callback_fields() {
        let names: Vec<_> = EventName::ALL.iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["process_message", "process_command", "process_chat", "stop"]
        );
    }

    #[test]
    fn only_message_and_chat_bear_decisions() {
        assert!(EventName::ProcessMessage.is_decision_bearing());
        assert!(EventName::ProcessChat.is_decision_bearing());
        assert!(!EventName::ProcessCommand.is_decision_bearing());
        assert!(!EventName::Stop.is_decision_bearing());
    }

    #[test]
    fn event_reports_its_callback_name() {
        assert_eq!(
            Event::Command(Command::default()).name(),
            EventName::ProcessCommand
        );
        assert_eq!(Event::Chat(Chat::default()).name(), EventName::ProcessChat);
        assert_eq!(Event::Stop.name(), EventName::Stop);
    }

    #[test]
    fn process_result_defaults_to_pass() {
        assert_eq!(ProcessResult::default(), ProcessResult::PassMessage);
        assert_eq!(ProcessResult::from_drop(true), ProcessResult::DropMessage);
        assert!(!ProcessResult::from_drop(false).is_drop());
        assert_eq!(ProcessResult::DropMessage.to_string(), "drop");
    }

    #[test]
    fn events_deserialize_from_tagged_toml() {
        #[derive(Deserialize)]
        struct Script {
            event: Vec<Event>,
        }

        let script: Script = toml::from_str(
            r##"
            [[event]]
            kind = "message"
            network = "libera"
            command = "PRIVMSG"
            params = ["#chan", "hi"]
            prefix = { nick = "alice" }

            [[event]]
            kind = "command"
            command = "reload"

            [[event]]
            kind = "stop"
            "##,
        )
        .unwrap();

        assert_eq!(script.event.len(), 3);
        match &script.event[0] {
            Event::Message(msg) => {
                assert_eq!(msg.prefix, Prefix::nick("alice"));
                assert!(msg.tags.is_empty());
                assert_eq!(msg.params, vec!["#chan", "hi"]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(script.event[2], Event::Stop);
    }
}
