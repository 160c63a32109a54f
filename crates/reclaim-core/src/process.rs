//! Snapshot records for processes holding a registered resource.

use bitflags::bitflags;

bitflags! {
    /// Application status as reported by the Restart Manager
    /// (`RM_APP_STATUS`). An empty set means the status is unknown.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AppStatus: u32 {
        /// The application is running.
        const RUNNING = 0x0000_0001;
        /// The application was stopped by the facility.
        const STOPPED = 0x0000_0002;
        /// The application was stopped by something else (user action,
        /// crash) while the session was active.
        const STOPPED_OTHER = 0x0000_0004;
        /// The application was restarted by the facility.
        const RESTARTED = 0x0000_0008;
        /// Shutdown was attempted and failed for this application.
        const ERROR_ON_STOP = 0x0000_0010;
        /// Restart was attempted and failed for this application.
        const ERROR_ON_RESTART = 0x0000_0020;
        /// The application is excluded from shutdown (e.g. critical).
        const SHUTDOWN_MASKED = 0x0000_0040;
        /// The application is excluded from restart.
        const RESTART_MASKED = 0x0000_0080;
    }
}

impl AppStatus {
    /// Whether the process stopped cleanly during the shutdown pass and
    /// is therefore a restart candidate (still subject to
    /// restartability).
    pub fn stopped_cleanly(self) -> bool {
        self.contains(Self::STOPPED) && !self.contains(Self::ERROR_ON_STOP)
    }
}

/// What kind of application holds the resource (`RM_APP_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppKind {
    Unknown,
    /// A GUI application with a main window.
    MainWindow,
    /// A GUI application without a main window (e.g. tray-only).
    OtherWindow,
    /// A Windows service.
    Service,
    /// The shell (Explorer).
    Explorer,
    /// A console application.
    Console,
    /// A critical process that may not be shut down; the facility
    /// reports it but a reboot is required to release its locks.
    Critical,
}

impl AppKind {
    /// Maps a raw `RM_APP_TYPE` value.
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => Self::MainWindow,
            2 => Self::OtherWindow,
            3 => Self::Service,
            4 => Self::Explorer,
            5 => Self::Console,
            1000 => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

/// One process currently holding a registered resource.
///
/// Immutable once produced; a later enumeration supersedes the whole
/// snapshot rather than mutating records in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockingProcess {
    /// Process identifier.
    pub pid: u32,
    /// Process creation time (FILETIME ticks) — disambiguates PID reuse.
    pub start_time: u64,
    /// The owning application's friendly name, if the OS knows one.
    pub app_name: String,
    /// Short service name, empty for non-services.
    pub service_name: String,
    pub kind: AppKind,
    pub status: AppStatus,
    /// Whether the process registered for restart and may be relaunched
    /// after a successful shutdown.
    pub restartable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_kind_maps_raw_values() {
        assert_eq!(AppKind::from_raw(0), AppKind::Unknown);
        assert_eq!(AppKind::from_raw(1), AppKind::MainWindow);
        assert_eq!(AppKind::from_raw(3), AppKind::Service);
        assert_eq!(AppKind::from_raw(1000), AppKind::Critical);
        assert_eq!(AppKind::from_raw(42), AppKind::Unknown);
    }

    #[test]
    fn stopped_cleanly_requires_stopped_without_error() {
        assert!(AppStatus::STOPPED.stopped_cleanly());
        assert!(!(AppStatus::STOPPED | AppStatus::ERROR_ON_STOP).stopped_cleanly());
        assert!(!AppStatus::RUNNING.stopped_cleanly());
        assert!(!AppStatus::empty().stopped_cleanly());
    }
}
