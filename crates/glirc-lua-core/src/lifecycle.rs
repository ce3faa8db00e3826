//! Start/stop orchestration for one loaded extension.
//!
//! ```text
//! Uninitialized --start ok--> Running --stop--> Stopped
//!       |                                         ^
//!       +------------start failed-----------------+
//! ```
//!
//! Dispatch failures never change state. Every entrypoint is a no-op unless
//! the extension is `Running`.

use crate::bootstrap::ExtensionInstance;
use crate::config::BridgeConfig;
use crate::error::LifecycleError;
use crate::event::{Chat, Command, Event, Message, ProcessResult};
use crate::host::HostToken;

/// Lifecycle state of an [`Extension`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    Stopped,
}

impl LifecycleState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl ExtensionInstance {
    /// Run the script's `stop` callback, then close the interpreter.
    pub fn stop(self) {
        let script = self.script_path.clone();
        self.dispatch(&Event::Stop);
        // Any stop diagnostic has been delivered (and copied) by now.
        drop(self);
        tracing::info!(script = %script, "lua extension stopped");
    }
}

enum Slot {
    Uninitialized,
    Running(ExtensionInstance),
    Stopped,
}

/// Host-facing handle for one loaded Lua extension.
///
/// Dropping a running extension stops it.
pub struct Extension {
    host: HostToken,
    config: BridgeConfig,
    slot: Slot,
}

impl Extension {
    pub fn new(host: HostToken, config: BridgeConfig) -> Self {
        Self {
            host,
            config,
            slot: Slot::Uninitialized,
        }
    }

    /// Start the interpreter and load the script.
    ///
    /// A failed bootstrap has already been reported to the host; the
    /// extension is then `Stopped` and ignores all further events.
    pub fn start(&mut self, library_path: &str, args: &[String]) -> Result<(), LifecycleError> {
        match self.slot {
            Slot::Uninitialized => {}
            Slot::Running(_) => return Err(LifecycleError::AlreadyStarted),
            Slot::Stopped => return Err(LifecycleError::Stopped),
        }

        match ExtensionInstance::start(self.host.clone(), library_path, args, &self.config) {
            Ok(instance) => {
                self.slot = Slot::Running(instance);
                Ok(())
            }
            Err(err) => {
                self.slot = Slot::Stopped;
                Err(err.into())
            }
        }
    }

    pub fn state(&self) -> LifecycleState {
        match self.slot {
            Slot::Uninitialized => LifecycleState::Uninitialized,
            Slot::Running(_) => LifecycleState::Running,
            Slot::Stopped => LifecycleState::Stopped,
        }
    }

    /// The live instance, if running.
    pub fn instance(&self) -> Option<&ExtensionInstance> {
        match &self.slot {
            Slot::Running(instance) => Some(instance),
            Slot::Uninitialized | Slot::Stopped => None,
        }
    }

    pub fn process_message(&self, message: &Message) -> ProcessResult {
        self.instance()
            .map_or(ProcessResult::PassMessage, |instance| instance.process_message(message))
    }

    pub fn process_command(&self, command: &Command) {
        if let Some(instance) = self.instance() {
            instance.process_command(command);
        }
    }

    pub fn process_chat(&self, chat: &Chat) -> ProcessResult {
        self.instance()
            .map_or(ProcessResult::PassMessage, |instance| instance.process_chat(chat))
    }

    /// Deliver any event; `Stop` stops the extension.
    pub fn handle(&mut self, event: &Event) -> Option<ProcessResult> {
        match event {
            Event::Message(message) => Some(self.process_message(message)),
            Event::Chat(chat) => Some(self.process_chat(chat)),
            Event::Command(command) => {
                self.process_command(command);
                None
            }
            Event::Stop => {
                self.stop();
                None
            }
        }
    }

    /// Stop the extension. A no-op unless running.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.slot, Slot::Stopped) {
            Slot::Running(instance) => instance.stop(),
            Slot::Uninitialized => self.slot = Slot::Uninitialized,
            Slot::Stopped => {}
        }
    }
}

impl Drop for Extension {
    fn drop(&mut self) {
        self.stop();
    }
}
