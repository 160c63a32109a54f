//! Hidden message window hosting a hook chain.
//!
//! Session-end notifications arrive as window messages, so a process
//! with no UI of its own still needs a window and a pump to receive
//! them. This module creates a hidden window on a dedicated thread and
//! routes every message it receives through a [`HookChain`]; a hook
//! that handles a message decides the result returned to the OS,
//! everything else falls through to `DefWindowProcW`.
//!
//! Hosts that already own a message loop skip this module and feed
//! their own messages into a [`HookChain`] directly.

use std::sync::mpsc;
use std::thread;

use reclaim_core::hook::{HookChain, WindowMessage};

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, MSG,
    PostThreadMessageW, RegisterClassW, TranslateMessage, WM_QUIT, WNDCLASSW, WS_EX_TOOLWINDOW,
};
use windows::core::w;

/// Errors from the window/pump plumbing, outside the session taxonomy.
pub type PumpResult<T> = Result<T, Box<dyn std::error::Error>>;

// The chain lives on the pump thread; the wndproc has no user data
// slot we control, so it reaches the chain through a thread-local.
thread_local! {
    static HOOK_CHAIN: std::cell::RefCell<Option<HookChain>> =
        const { std::cell::RefCell::new(None) };
}

/// Starts the message window on a new thread.
///
/// `install` runs on that thread before the first message is pumped
/// and populates the hook chain (typically with a
/// [`SessionEndMonitor`](reclaim_core::session_end::SessionEndMonitor)).
pub fn start<F>(install: F) -> PumpResult<MessageWindowHandle>
where
    F: FnOnce(&mut HookChain) + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();

    let handle = thread::spawn(move || {
        let mut chain = HookChain::new();
        install(&mut chain);
        HOOK_CHAIN.with(|cell| {
            *cell.borrow_mut() = Some(chain);
        });

        let thread_id = unsafe { windows::Win32::System::Threading::GetCurrentThreadId() };

        let Some(hwnd) = create_message_window() else {
            let _ = ready_tx.send(Err("failed to create message window".to_string()));
            return;
        };

        let _ = ready_tx.send(Ok(thread_id));

        run_message_pump();

        // Cleanup: destroy the window, then drop the chain so no
        // dispatch can happen past this point.
        unsafe {
            let _ = DestroyWindow(hwnd);
        }
        HOOK_CHAIN.with(|cell| {
            *cell.borrow_mut() = None;
        });
    });

    let thread_id: u32 = ready_rx
        .recv()
        .map_err(|_| -> Box<dyn std::error::Error> {
            "message window thread exited unexpectedly".into()
        })?
        .map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;

    Ok(MessageWindowHandle { thread_id, handle })
}

/// Handle for stopping the message window thread.
pub struct MessageWindowHandle {
    thread_id: u32,
    handle: thread::JoinHandle<()>,
}

impl MessageWindowHandle {
    /// Signals the pump to stop and waits for the thread to finish.
    pub fn stop(self) {
        unsafe {
            let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
        }
        let _ = self.handle.join();
    }
}

/// The Win32 message pump. Blocks until WM_QUIT is received.
fn run_message_pump() {
    let mut msg = MSG::default();

    while unsafe { GetMessageW(&mut msg, None, 0, 0).as_bool() } {
        unsafe {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

/// Creates the hidden window that receives session-end broadcasts.
///
/// Must NOT be a message-only window (`HWND_MESSAGE` parent) because
/// those do not receive broadcast messages like `WM_QUERYENDSESSION`.
/// Instead we create a regular hidden window with `WS_EX_TOOLWINDOW`
/// to keep it out of the taskbar.
fn create_message_window() -> Option<HWND> {
    unsafe {
        let class_name = w!("ReclaimMessageWindow");
        let wc = WNDCLASSW {
            lpfnWndProc: Some(message_proc),
            lpszClassName: class_name.into(),
            ..Default::default()
        };

        if RegisterClassW(&wc) == 0 {
            reclaim_core::log_error!("failed to register ReclaimMessageWindow class");
            return None;
        }

        // WS_EX_TOOLWINDOW: no taskbar entry.
        // No WS_VISIBLE: window stays hidden.
        let hwnd = CreateWindowExW(
            WS_EX_TOOLWINDOW,
            class_name,
            w!("ReclaimMessageWindow"),
            Default::default(),
            0,
            0,
            0,
            0,
            None,
            None,
            None,
            None,
        );

        match hwnd {
            Ok(h) if !h.is_invalid() => Some(h),
            _ => {
                reclaim_core::log_error!("failed to create ReclaimMessageWindow window");
                None
            }
        }
    }
}

/// WNDPROC for the message window.
///
/// Offers every message to the hook chain; unhandled messages are
/// passed to `DefWindowProcW`. Once the chain has been torn down this
/// is a straight passthrough.
unsafe extern "system" fn message_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let message = WindowMessage {
        hwnd: hwnd.0 as usize,
        id: msg,
        wparam: wparam.0,
        lparam: lparam.0,
    };

    let handled = HOOK_CHAIN.with(|cell| {
        cell.borrow_mut()
            .as_mut()
            .and_then(|chain| chain.dispatch(&message))
    });

    match handled {
        Some(result) => LRESULT(result),
        None => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}
