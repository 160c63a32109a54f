pub mod config;
pub mod error;
pub mod hook;
pub mod log;
pub mod process;
pub mod service;
pub mod session;
pub mod session_end;

pub use config::{Config, RestartConfig};
pub use error::{Error, OsFailure, RegistrationFailure, Result};
pub use hook::{HookChain, HookId, MessageHook, WindowMessage};
pub use process::{AppKind, AppStatus, LockingProcess};
pub use service::{RestartService, SessionId, ShutdownScope};
pub use session::ConflictSession;
pub use session_end::{
    EndSessionReasons, SessionEndDecision, SessionEndEvent, SessionEndKind, SessionEndMonitor,
};
