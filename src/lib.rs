//! keyrelay - use a phone browser as a keyboard for this computer
//!
//! Text sent from the phone is rewritten by an ordered list of regex rules,
//! then pasted into whatever window has focus. The most recent text or Enter
//! can be undone once.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod history;
pub mod injector;
pub mod net;
pub mod protocol;
pub mod rules;
pub mod server;
pub mod tracing;

// Re-export commonly used types
pub use config::RelayConfig;
pub use history::{Operation, Replaced, UndoError, UndoHistory};
pub use injector::{Direction, HostInjector, InjectError, InputInjector, MemoryInjector};
pub use protocol::{Action, ProtocolError, Reply, Session};
pub use rules::{ReplacementRule, RuleEngine, RuleError};
pub use server::{RelayServer, ServerError, ShutdownHandle};
