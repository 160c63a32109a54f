//! The Restart Manager backend (`rstrtmgr.dll`).
//!
//! Implements [`RestartService`] over the raw Rm* API. The progress
//! callback the OS invokes during `RmShutdown`/`RmRestart` carries no
//! user data, so the caller's closure is parked in a thread-local for
//! the duration of the blocking call — the facility invokes the
//! callback synchronously on the calling thread.

use std::cell::RefCell;
use std::ffi::c_void;
use std::path::Path;
use std::ptr;

use reclaim_core::error::{Error, RegistrationFailure, Result};
use reclaim_core::process::{AppKind, AppStatus, LockingProcess};
use reclaim_core::service::{RestartService, SessionId, ShutdownScope};
use reclaim_core::{OsFailure, log_debug};

use windows::Win32::Foundation::FILETIME;

use crate::strings::{from_wide_buf, to_wide};

const ERROR_SUCCESS: u32 = 0;
const ERROR_MORE_DATA: u32 = 234;

/// Session key length (`CCH_RM_SESSION_KEY`), excluding the terminator.
const CCH_RM_SESSION_KEY: usize = 32;

/// `RmForceShutdown`: force hung or unresponsive applications closed.
const RM_FORCE_SHUTDOWN: u32 = 0x1;
/// `RmShutdownOnlyRegistered`: touch only restart-registered processes.
const RM_SHUTDOWN_ONLY_REGISTERED: u32 = 0x10;

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(non_camel_case_types, non_snake_case)]
struct RM_UNIQUE_PROCESS {
    dwProcessId: u32,
    ProcessStartTime: FILETIME,
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(non_camel_case_types, non_snake_case)]
struct RM_PROCESS_INFO {
    Process: RM_UNIQUE_PROCESS,
    strAppName: [u16; 256],
    strServiceShortName: [u16; 64],
    ApplicationType: u32,
    AppStatus: u32,
    TSSessionId: u32,
    bRestartable: i32,
}

impl Default for RM_PROCESS_INFO {
    fn default() -> Self {
        // SAFETY: all fields are plain data; zero is a valid value.
        unsafe { std::mem::zeroed() }
    }
}

type RmStatusCallback = Option<unsafe extern "system" fn(npercentcomplete: u32)>;

#[link(name = "rstrtmgr")]
#[allow(non_snake_case)]
unsafe extern "system" {
    fn RmStartSession(psessionhandle: *mut u32, dwsessionflags: u32, strsessionkey: *mut u16)
    -> u32;
    fn RmRegisterResources(
        dwsessionhandle: u32,
        nfiles: u32,
        rgsfilenames: *const *const u16,
        napplications: u32,
        rgapplications: *const c_void,
        nservices: u32,
        rgsservicenames: *const *const u16,
    ) -> u32;
    fn RmGetList(
        dwsessionhandle: u32,
        pnprocinfoneeded: *mut u32,
        pnprocinfo: *mut u32,
        rgaffectedapps: *mut RM_PROCESS_INFO,
        lpdwrebootreasons: *mut u32,
    ) -> u32;
    fn RmShutdown(dwsessionhandle: u32, lactionflags: u32, fnstatus: RmStatusCallback) -> u32;
    fn RmRestart(dwsessionhandle: u32, dwrestartflags: u32, fnstatus: RmStatusCallback) -> u32;
    fn RmEndSession(dwsessionhandle: u32) -> u32;
}

// Parks the caller's progress closure while an Rm call is in flight.
thread_local! {
    static PROGRESS_SINK: RefCell<Option<*mut dyn FnMut(u32)>> = const { RefCell::new(None) };
}

/// The native status callback. Forwards to the parked closure.
unsafe extern "system" fn progress_thunk(pct: u32) {
    PROGRESS_SINK.with(|cell| {
        if let Some(sink) = *cell.borrow() {
            // SAFETY: the pointer is only set for the duration of the
            // blocking Rm call on this same thread, and the callback is
            // invoked synchronously within that call.
            unsafe { (*sink)(pct) };
        }
    });
}

/// Clears the parked closure when the Rm call returns, on every path.
struct SinkGuard;

impl Drop for SinkGuard {
    fn drop(&mut self) {
        PROGRESS_SINK.with(|cell| *cell.borrow_mut() = None);
    }
}

fn with_progress_sink<R>(progress: &mut dyn FnMut(u32), call: impl FnOnce() -> R) -> R {
    PROGRESS_SINK.with(|cell| {
        *cell.borrow_mut() = Some(ptr::from_mut(progress) as *mut (dyn FnMut(u32) + 'static));
    });
    let _guard = SinkGuard;
    call()
}

fn convert(info: &RM_PROCESS_INFO) -> LockingProcess {
    let start = &info.Process.ProcessStartTime;
    LockingProcess {
        pid: info.Process.dwProcessId,
        start_time: (u64::from(start.dwHighDateTime) << 32) | u64::from(start.dwLowDateTime),
        app_name: from_wide_buf(&info.strAppName),
        service_name: from_wide_buf(&info.strServiceShortName),
        kind: AppKind::from_raw(info.ApplicationType),
        status: AppStatus::from_bits_truncate(info.AppStatus),
        restartable: info.bRestartable != 0,
    }
}

/// The real OS facility.
#[derive(Debug, Default)]
pub struct RmService;

impl RmService {
    pub fn new() -> Self {
        Self
    }
}

impl RestartService for RmService {
    fn start_session(&mut self) -> Result<SessionId> {
        let mut handle = 0u32;
        let mut key = [0u16; CCH_RM_SESSION_KEY + 1];

        // SAFETY: both out-pointers reference live stack storage; the
        // key buffer has the documented CCH_RM_SESSION_KEY+1 capacity.
        let code = unsafe { RmStartSession(&mut handle, 0, key.as_mut_ptr()) };
        if code != ERROR_SUCCESS {
            return Err(Error::SessionCreation(OsFailure::from_code(code)));
        }
        Ok(handle)
    }

    fn register_file(&mut self, session: SessionId, path: &Path) -> Result<()> {
        let wide = to_wide(path.as_os_str());
        // An interior NUL would silently truncate the path on the
        // native side; reject it instead of registering the wrong file.
        if wide[..wide.len() - 1].contains(&0) {
            return Err(Error::Registration {
                path: path.display().to_string(),
                reason: RegistrationFailure::BadPath,
            });
        }
        let names = [wide.as_ptr()];

        // SAFETY: `names` holds one pointer to a null-terminated UTF-16
        // string that outlives the call; no applications or services
        // are registered.
        let code = unsafe {
            RmRegisterResources(session, 1, names.as_ptr(), 0, ptr::null(), 0, ptr::null())
        };
        if code != ERROR_SUCCESS {
            return Err(Error::Registration {
                path: path.display().to_string(),
                reason: RegistrationFailure::Os(OsFailure::from_code(code)),
            });
        }
        Ok(())
    }

    fn process_list(&mut self, session: SessionId) -> Result<Vec<LockingProcess>> {
        let mut reasons = 0u32;
        let mut needed = 0u32;
        let mut count = 0u32;

        // Size probe. ERROR_MORE_DATA here just means the list is
        // non-empty; `needed` comes back with the required capacity.
        // SAFETY: a zero-capacity call is the documented way to ask for
        // the required buffer size.
        let code =
            unsafe { RmGetList(session, &mut needed, &mut count, ptr::null_mut(), &mut reasons) };
        if code != ERROR_SUCCESS && code != ERROR_MORE_DATA {
            return Err(Error::Enumeration(OsFailure::from_code(code)));
        }

        // Processes can appear between the probe and the fetch, so the
        // fetch itself may come back ERROR_MORE_DATA again; re-issue
        // with the newly reported size until it fits.
        loop {
            if needed == 0 {
                return Ok(Vec::new());
            }
            let mut buf = vec![RM_PROCESS_INFO::default(); needed as usize];
            count = needed;

            // SAFETY: `buf` provides `count` elements of storage.
            let code = unsafe {
                RmGetList(session, &mut needed, &mut count, buf.as_mut_ptr(), &mut reasons)
            };
            match code {
                ERROR_SUCCESS => {
                    return Ok(buf[..count as usize].iter().map(convert).collect());
                }
                ERROR_MORE_DATA => {
                    log_debug!("RmGetList buffer grew to {needed}, retrying");
                }
                other => return Err(Error::Enumeration(OsFailure::from_code(other))),
            }
        }
    }

    fn shutdown(
        &mut self,
        session: SessionId,
        scope: ShutdownScope,
        progress: &mut dyn FnMut(u32),
    ) -> Result<()> {
        let flags = match scope {
            ShutdownScope::All => RM_FORCE_SHUTDOWN,
            ShutdownScope::RegisteredOnly => RM_SHUTDOWN_ONLY_REGISTERED,
        };

        let code = with_progress_sink(progress, || {
            // SAFETY: the thunk reads the thread-local sink that stays
            // set for exactly this call.
            unsafe { RmShutdown(session, flags, Some(progress_thunk)) }
        });
        if code != ERROR_SUCCESS {
            return Err(Error::Shutdown(OsFailure::from_code(code)));
        }
        Ok(())
    }

    fn restart(&mut self, session: SessionId, progress: &mut dyn FnMut(u32)) -> Result<()> {
        let code = with_progress_sink(progress, || {
            // SAFETY: as for shutdown; the restart flags are reserved
            // and must be zero.
            unsafe { RmRestart(session, 0, Some(progress_thunk)) }
        });
        if code != ERROR_SUCCESS {
            return Err(Error::Restart(OsFailure::from_code(code)));
        }
        Ok(())
    }

    fn end_session(&mut self, session: SessionId) -> Result<()> {
        // SAFETY: RmEndSession takes the raw handle by value.
        let code = unsafe { RmEndSession(session) };
        if code != ERROR_SUCCESS {
            return Err(Error::HandleRelease(OsFailure::from_code(code)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use std::path::PathBuf;

    #[test]
    fn interior_nul_in_path_is_rejected_before_the_facility_sees_it() {
        // "a\0b" as a path. The check runs before any native call, so
        // the bogus session handle is never dereferenced.
        let path = PathBuf::from(OsString::from_wide(&[0x61, 0, 0x62]));

        let result = RmService::new().register_file(0, &path);
        assert!(matches!(
            result,
            Err(Error::Registration {
                reason: RegistrationFailure::BadPath,
                ..
            })
        ));
    }
}
