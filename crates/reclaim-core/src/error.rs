use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the resource conflict session and its backends.
///
/// Variants mirror the operation that failed so callers can decide
/// whether to retry, escalate to the user, or abandon. The underlying
/// OS cause is carried as an [`OsFailure`] where one exists.
#[derive(Debug, Error)]
pub enum Error {
    /// The OS refused to open a new Restart Manager session.
    #[error("could not open a restart session: {0}")]
    SessionCreation(OsFailure),

    /// A resource path could not be registered with the session.
    #[error("cannot register `{path}`: {reason}")]
    Registration {
        path: String,
        reason: RegistrationFailure,
    },

    /// The locking-process enumeration failed.
    #[error("could not enumerate locking processes: {0}")]
    Enumeration(OsFailure),

    /// Shutdown completed partially or not at all.
    ///
    /// The session stays usable: call `processes()` again to learn
    /// which processes are still running and why each one failed.
    #[error("shutdown did not complete: {0}")]
    Shutdown(OsFailure),

    /// The restart pass itself failed. Per-process restart failures are
    /// reported through [`AppStatus`](crate::process::AppStatus) codes
    /// in the next snapshot instead of this error.
    #[error("restart did not complete: {0}")]
    Restart(OsFailure),

    /// Releasing the session handle failed. The session's cleanup path
    /// logs this and never propagates it — disposal must not fail.
    #[error("could not release the session handle: {0}")]
    HandleRelease(OsFailure),

    /// The operation was issued after the session was closed.
    #[error("the session is closed")]
    SessionClosed,
}

/// Why a resource registration was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistrationFailure {
    /// Registration arrived after the first shutdown attempt. The
    /// resource set is frozen from that point on.
    #[error("shutdown has already started")]
    ShutdownStarted,

    /// The path could not be converted to the form the OS requires.
    #[error("path cannot be represented as a native string")]
    BadPath,

    /// The OS rejected the registration call.
    #[error("{0}")]
    Os(OsFailure),
}

/// Classified Win32 failure causes.
///
/// Raw error codes from `rstrtmgr.dll` are folded into these buckets;
/// anything unrecognized is preserved verbatim in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OsFailure {
    /// ERROR_ACCESS_DENIED — typically a session owned by another user,
    /// or a service the caller may not stop.
    #[error("access denied")]
    AccessDenied,

    /// ERROR_INVALID_PARAMETER / ERROR_INVALID_HANDLE.
    #[error("invalid argument or handle")]
    BadArguments,

    /// ERROR_CALL_NOT_IMPLEMENTED — Restart Manager is unavailable on
    /// this Windows edition.
    #[error("not supported on this Windows version")]
    Unsupported,

    /// ERROR_SEM_TIMEOUT — a process did not respond within the
    /// facility's shutdown deadline.
    #[error("timed out waiting for a process")]
    Timeout,

    /// ERROR_MORE_DATA — the negotiated buffer was too small. Handled
    /// internally by re-issuing the call with the required size; seeing
    /// this from a public API is a bug in the backend.
    #[error("result buffer too small")]
    MoreData,

    /// ERROR_FAIL_NOACTION_REBOOT — nothing could be done; a reboot is
    /// required to release the resource.
    #[error("no action possible without a reboot")]
    RebootRequired,

    /// ERROR_FAIL_SHUTDOWN — one or more processes could not be shut
    /// down. Re-enumerate for per-process status.
    #[error("one or more processes could not be shut down")]
    ShutdownIncomplete,

    /// ERROR_FAIL_RESTART — one or more processes could not be
    /// restarted. Re-enumerate for per-process status.
    #[error("one or more processes could not be restarted")]
    RestartIncomplete,

    /// ERROR_MAX_SESSIONS_REACHED — the per-machine session table is
    /// exhausted.
    #[error("too many restart sessions are open")]
    TooManySessions,

    /// ERROR_CANCELLED — a user vetoed the close (open save dialog,
    /// explicit refusal).
    #[error("cancelled by the user")]
    Cancelled,

    /// Any other Win32 error code.
    #[error("Win32 error {0}")]
    Other(u32),
}

impl OsFailure {
    /// Folds a raw Win32 error code into a classified failure.
    pub fn from_code(code: u32) -> Self {
        match code {
            5 => Self::AccessDenied,
            6 | 87 => Self::BadArguments,
            120 => Self::Unsupported,
            121 => Self::Timeout,
            234 => Self::MoreData,
            350 => Self::RebootRequired,
            351 => Self::ShutdownIncomplete,
            352 => Self::RestartIncomplete,
            353 => Self::TooManySessions,
            1223 => Self::Cancelled,
            other => Self::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_are_classified() {
        assert_eq!(OsFailure::from_code(5), OsFailure::AccessDenied);
        assert_eq!(OsFailure::from_code(87), OsFailure::BadArguments);
        assert_eq!(OsFailure::from_code(120), OsFailure::Unsupported);
        assert_eq!(OsFailure::from_code(121), OsFailure::Timeout);
        assert_eq!(OsFailure::from_code(234), OsFailure::MoreData);
        assert_eq!(OsFailure::from_code(351), OsFailure::ShutdownIncomplete);
        assert_eq!(OsFailure::from_code(352), OsFailure::RestartIncomplete);
        assert_eq!(OsFailure::from_code(353), OsFailure::TooManySessions);
        assert_eq!(OsFailure::from_code(1223), OsFailure::Cancelled);
    }

    #[test]
    fn unknown_codes_are_preserved() {
        assert_eq!(OsFailure::from_code(1460), OsFailure::Other(1460));
    }

    #[test]
    fn errors_render_their_cause() {
        let err = Error::SessionCreation(OsFailure::TooManySessions);
        assert!(err.to_string().contains("too many restart sessions"));

        let err = Error::Registration {
            path: r"C:\app.exe".into(),
            reason: RegistrationFailure::ShutdownStarted,
        };
        assert!(err.to_string().contains("shutdown has already started"));
    }
}
