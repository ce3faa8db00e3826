//! Lua extension bridge for the glirc IRC client.
//!
//! The client loads one extension per script. For each, the bridge starts a
//! Lua interpreter, runs the user's script, and keeps the table of callbacks
//! the script returns:
//!
//! ```lua
//! return {
//!   process_message = function(msg) ... end,  -- true drops the message
//!   process_command = function(cmd) ... end,  -- /extension Lua <text>
//!   process_chat    = function(chat) ... end, -- true drops the chat line
//!   stop            = function() ... end,
//! }
//! ```
//!
//! Host events are marshaled into Lua tables ([`marshal`]), delivered under
//! error isolation ([`dispatch`]), and the interpreter is closed on stop
//! ([`lifecycle`]). Script errors are reported through the [`Host`] and
//! treated as "pass"; they never take the client down.

pub mod bindings;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod marshal;

pub use bootstrap::ExtensionInstance;
pub use config::BridgeConfig;
pub use dispatch::CallOutcome;
pub use error::{BootstrapError, LifecycleError};
pub use event::{Chat, Command, Event, EventName, Message, Prefix, ProcessResult};
pub use host::{Host, HostToken, MessageCode};
pub use lifecycle::{Extension, LifecycleState};

/// Extension name reported to the host.
pub const EXTENSION_NAME: &str = "Lua";

/// Extension interface version, also visible to scripts as `glirc.version`.
pub const API_MAJOR_VERSION: u32 = 0;
pub const API_MINOR_VERSION: u32 = 1;
