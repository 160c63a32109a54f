//! Process restart registration.
//!
//! Tells the OS how to relaunch this process if it is terminated for
//! servicing (or crash/hang, unless masked off). Best-effort: callers
//! should log a failure and carry on, not abort startup over it.

use std::ffi::OsStr;

use reclaim_core::config::{RESTART_MAX_CMD_LINE, RestartConfig};
use reclaim_core::error::{Error, Result};
use reclaim_core::{OsFailure, log_info};

use crate::strings::to_wide;

#[link(name = "kernel32")]
#[allow(non_snake_case)]
unsafe extern "system" {
    fn RegisterApplicationRestart(pwzcommandline: *const u16, dwflags: u32) -> i32;
    fn UnregisterApplicationRestart() -> i32;
}

/// Extracts the Win32 code from an HRESULT where one is embedded.
fn classify_hresult(hr: i32) -> OsFailure {
    let raw = hr as u32;
    if raw & 0xFFFF_0000 == 0x8007_0000 {
        OsFailure::from_code(raw & 0xFFFF)
    } else {
        OsFailure::Other(raw)
    }
}

/// Registers the current process for relaunch with the configured
/// command line. Re-registration overwrites the previous one; the
/// registration dies with the process.
pub fn register_for_restart(config: &RestartConfig) -> Result<()> {
    let wide;
    let commandline = if config.command_line.is_empty() {
        // Null means "relaunch with no arguments".
        std::ptr::null()
    } else {
        wide = to_wide(OsStr::new(&config.command_line));
        if wide.len() > RESTART_MAX_CMD_LINE {
            return Err(Error::Restart(OsFailure::BadArguments));
        }
        wide.as_ptr()
    };

    // SAFETY: the command line is either null or a null-terminated
    // UTF-16 string that outlives the call.
    let hr = unsafe { RegisterApplicationRestart(commandline, config.flag_bits()) };
    if hr < 0 {
        return Err(Error::Restart(classify_hresult(hr)));
    }
    log_info!("registered for restart: `{}`", config.command_line);
    Ok(())
}

/// Removes the current process's restart registration.
pub fn unregister_for_restart() -> Result<()> {
    // SAFETY: no arguments; acts on the current process.
    let hr = unsafe { UnregisterApplicationRestart() };
    if hr < 0 {
        return Err(Error::Restart(classify_hresult(hr)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlong_command_line_is_rejected() {
        let config = RestartConfig::with_command_line("x".repeat(RESTART_MAX_CMD_LINE + 1));
        let result = register_for_restart(&config);
        assert!(matches!(
            result,
            Err(Error::Restart(OsFailure::BadArguments))
        ));
    }

    #[test]
    fn hresult_win32_facility_is_unwrapped() {
        // E_ACCESSDENIED == HRESULT_FROM_WIN32(ERROR_ACCESS_DENIED)
        assert_eq!(
            classify_hresult(0x8007_0005_u32 as i32),
            OsFailure::AccessDenied
        );
    }

    #[test]
    fn other_hresults_are_preserved() {
        assert_eq!(
            classify_hresult(0x8000_4005_u32 as i32),
            OsFailure::Other(0x8000_4005)
        );
    }
}
