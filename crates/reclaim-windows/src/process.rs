use windows::Win32::Foundation::{CloseHandle, E_ACCESSDENIED};
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

/// Checks whether a process with the given PID is still running.
///
/// Snapshot records can outlive the processes they describe, so `who`
/// uses this to flag entries whose process has already gone away on
/// its own. A least-privilege `OpenProcess` is the probe: an open
/// handle means the process exists, and so does an access-denied
/// refusal — protected processes reject the open but are very much
/// alive. Only a rejection of the PID itself means the process is gone.
pub fn still_running(pid: u32) -> bool {
    // SAFETY: OpenProcess attempts to open an existing process.
    // PROCESS_QUERY_LIMITED_INFORMATION is the least-privilege access
    // right that still lets us confirm the process exists.
    match unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) } {
        Ok(handle) => {
            // SAFETY: the handle was only opened for the existence
            // check; close it immediately.
            unsafe {
                let _ = CloseHandle(handle);
            }
            true
        }
        Err(err) => err.code() == E_ACCESSDENIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_current_process_is_running() {
        assert!(still_running(std::process::id()));
    }

    #[test]
    fn an_impossible_pid_is_not_running() {
        // PIDs are multiples of 4; 3 can never name a process and the
        // open fails with ERROR_INVALID_PARAMETER, not access-denied.
        assert!(!still_running(3));
    }
}
