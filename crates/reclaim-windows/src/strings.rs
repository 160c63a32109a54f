//! UTF-16 conversion helpers for Win32 calls.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;

/// Converts an OS string to a null-terminated UTF-16 buffer.
pub fn to_wide(s: &OsStr) -> Vec<u16> {
    s.encode_wide().chain(std::iter::once(0)).collect()
}

/// Reads a fixed-size UTF-16 buffer up to its first null terminator.
pub fn from_wide_buf(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..len])
}
