//! The resource conflict session.
//!
//! A [`ConflictSession`] wraps one OS-level restart session: register
//! the files you want exclusive access to, ask who is holding them,
//! shut those processes down, and restart the survivors once you are
//! done. All calls are synchronous and must be issued by the single
//! owner; shutdown and restart can run for seconds and do not belong on
//! a UI message-loop thread.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, RegistrationFailure, Result};
use crate::process::LockingProcess;
use crate::service::{RestartService, SessionId, ShutdownScope};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Resources may still be registered; no shutdown attempted yet.
    Open,
    /// At least one shutdown pass has run. The resource set is frozen
    /// from the first attempt on, even if that attempt failed.
    ShutDown { complete: bool },
    /// A restart pass has run; only enumeration and close remain.
    Restarted,
    /// The OS handle has been released. Terminal.
    Closed,
}

/// A scoped session against the OS restart facility.
///
/// The OS handle is released exactly once, on [`close`](Self::close) or
/// on drop, whichever comes first — including when a shutdown or
/// restart call returned an error in between.
pub struct ConflictSession<S: RestartService> {
    service: S,
    id: SessionId,
    phase: Phase,
    resources: BTreeSet<PathBuf>,
    snapshot: Vec<LockingProcess>,
}

impl<S: RestartService> ConflictSession<S> {
    /// Opens a new session with the facility.
    pub fn start(mut service: S) -> Result<Self> {
        let id = service.start_session()?;
        crate::log_debug!("restart session {id} opened");
        Ok(Self {
            service,
            id,
            phase: Phase::Open,
            resources: BTreeSet::new(),
            snapshot: Vec::new(),
        })
    }

    /// Registers a file path with this session.
    ///
    /// The resource set is a set: registering the same path twice is a
    /// no-op. Registration is rejected once the first shutdown attempt
    /// has been made.
    pub fn register_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        match self.phase {
            Phase::Closed => return Err(Error::SessionClosed),
            Phase::Open => {}
            _ => {
                return Err(Error::Registration {
                    path: path.display().to_string(),
                    reason: RegistrationFailure::ShutdownStarted,
                });
            }
        }
        if self.resources.contains(path) {
            return Ok(());
        }
        self.service.register_file(self.id, path)?;
        self.resources.insert(path.to_path_buf());
        Ok(())
    }

    /// The paths registered so far.
    pub fn resources(&self) -> impl Iterator<Item = &Path> {
        self.resources.iter().map(PathBuf::as_path)
    }

    /// Queries the facility for every process currently holding a
    /// registered resource and replaces the stored snapshot with the
    /// result. An empty list means nothing is blocking.
    ///
    /// Call this again after a failed shutdown: the per-process status
    /// codes in the fresh snapshot say which processes refused to close
    /// and why.
    pub fn processes(&mut self) -> Result<&[LockingProcess]> {
        if self.phase == Phase::Closed {
            return Err(Error::SessionClosed);
        }
        self.snapshot = self.service.process_list(self.id)?;
        Ok(&self.snapshot)
    }

    /// The snapshot from the most recent [`processes`](Self::processes)
    /// call. Never partially updated.
    pub fn last_snapshot(&self) -> &[LockingProcess] {
        &self.snapshot
    }

    /// Shuts down the processes selected by `scope`.
    ///
    /// `on_progress` receives percentages in `[0, 100]`, never
    /// decreasing, on the calling thread; the final value may be below
    /// 100 when the pass fails partway. A partial or total failure
    /// returns [`Error::Shutdown`] but leaves the session usable —
    /// re-enumerate to see what is still running, then retry or give
    /// up. The resource set is frozen from the first attempt on.
    pub fn shutdown(
        &mut self,
        scope: ShutdownScope,
        mut on_progress: impl FnMut(u32),
    ) -> Result<()> {
        match self.phase {
            Phase::Closed => return Err(Error::SessionClosed),
            Phase::Restarted => return Err(Error::Shutdown(crate::OsFailure::BadArguments)),
            _ => {}
        }
        self.phase = Phase::ShutDown { complete: false };

        let mut last = 0u32;
        let mut monotonic = |raw: u32| {
            let pct = raw.min(100).max(last);
            last = pct;
            on_progress(pct);
        };

        self.service.shutdown(self.id, scope, &mut monotonic)?;
        self.phase = Phase::ShutDown { complete: true };
        Ok(())
    }

    /// Restarts the processes the preceding shutdown pass stopped
    /// cleanly, where they registered for restart.
    ///
    /// Requires a prior [`shutdown`](Self::shutdown) attempt. A process
    /// that cannot be restarted shows up with an error status in the
    /// next snapshot; only a session-level failure is returned here.
    pub fn restart(&mut self, mut on_progress: impl FnMut(u32)) -> Result<()> {
        match self.phase {
            Phase::Closed => return Err(Error::SessionClosed),
            Phase::Open => return Err(Error::Restart(crate::OsFailure::BadArguments)),
            _ => {}
        }

        let mut last = 0u32;
        let mut monotonic = |raw: u32| {
            let pct = raw.min(100).max(last);
            last = pct;
            on_progress(pct);
        };

        self.service.restart(self.id, &mut monotonic)?;
        self.phase = Phase::Restarted;
        Ok(())
    }

    /// Releases the OS session handle. Idempotent: the first call
    /// releases, later calls do nothing. Release failures are logged,
    /// not returned — cleanup paths must not fail.
    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.phase = Phase::Closed;
        if let Err(err) = self.service.end_session(self.id) {
            crate::log_warn!("failed to release restart session {}: {err}", self.id);
        } else {
            crate::log_debug!("restart session {} closed", self.id);
        }
    }
}

impl<S: RestartService> Drop for ConflictSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}
