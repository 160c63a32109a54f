//! The narrow boundary to the OS restart facility.
//!
//! [`ConflictSession`](crate::session::ConflictSession) drives all of
//! its OS calls through this trait so the platform crate can supply the
//! real Restart Manager and tests can supply a scripted fake.

use std::path::Path;

use crate::error::Result;
use crate::process::LockingProcess;

/// Opaque OS session identity. Only meaningful to the service that
/// issued it; invalid after `end_session`.
pub type SessionId = u32;

/// Which processes a shutdown pass may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownScope {
    /// Only processes that registered for restart. The conservative
    /// default: anything else cannot be safely relaunched afterwards.
    #[default]
    RegisteredOnly,
    /// Every process holding a registered resource, restartable or not.
    All,
}

/// The facility operations, in the order a session issues them.
///
/// `shutdown` and `restart` are synchronous and may run for seconds;
/// they report progress through the callback on the calling thread.
pub trait RestartService {
    /// Opens a new session and returns its handle.
    fn start_session(&mut self) -> Result<SessionId>;

    /// Registers one resource path against the session.
    fn register_file(&mut self, session: SessionId, path: &Path) -> Result<()>;

    /// Returns the full current set of processes holding any registered
    /// resource. Implementations must absorb buffer truncation by
    /// retrying with the size the OS asked for.
    fn process_list(&mut self, session: SessionId) -> Result<Vec<LockingProcess>>;

    /// Shuts down the processes selected by `scope`.
    fn shutdown(
        &mut self,
        session: SessionId,
        scope: ShutdownScope,
        progress: &mut dyn FnMut(u32),
    ) -> Result<()>;

    /// Restarts the processes that stopped cleanly and are restartable.
    fn restart(&mut self, session: SessionId, progress: &mut dyn FnMut(u32)) -> Result<()>;

    /// Releases the session handle.
    fn end_session(&mut self, session: SessionId) -> Result<()>;
}
