//! Ordered chain-of-responsibility for native window messages.
//!
//! The platform crate subclasses a real window and feeds every message
//! it receives through a [`HookChain`]. Hooks run in registration order
//! and the first one that returns a result wins; unhandled messages
//! fall through to the default window procedure on the platform side.

use std::panic::{AssertUnwindSafe, catch_unwind};

/// A raw native window message.
///
/// The window handle is a pointer-sized integer so this type stays free
/// of any platform crate dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMessage {
    /// Handle of the window the message was delivered to.
    pub hwnd: usize,
    /// The message identifier (e.g. `WM_ENDSESSION`).
    pub id: u32,
    /// First message-specific parameter.
    pub wparam: usize,
    /// Second message-specific parameter.
    pub lparam: isize,
}

/// A message interceptor.
///
/// Returning `Some(result)` marks the message handled: `result` is
/// returned to the OS and no later hook sees the message. Returning
/// `None` passes the message to the next hook in the chain.
pub trait MessageHook {
    fn try_handle(&mut self, msg: &WindowMessage) -> Option<isize>;
}

/// Token identifying a hook registration, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookId(u64);

/// An ordered list of message hooks attached to a single window.
///
/// First-registered gets first refusal: dispatch walks the chain in
/// registration order and stops at the first hook that handles the
/// message. This ordering is a user-visible contract.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<(HookId, Box<dyn MessageHook>)>,
    next_id: u64,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook to the end of the chain and returns its token.
    pub fn add_hook(&mut self, hook: Box<dyn MessageHook>) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.hooks.push((id, hook));
        id
    }

    /// Removes the first entry matching `id`. Returns whether an entry
    /// was removed.
    pub fn remove_hook(&mut self, id: HookId) -> bool {
        match self.hooks.iter().position(|(hid, _)| *hid == id) {
            Some(pos) => {
                self.hooks.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Removes every hook. Dispatch on an empty chain is a no-op.
    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Offers `msg` to each hook in registration order.
    ///
    /// Returns the result of the first hook that handled it, or `None`
    /// if the message should fall through to the default window
    /// procedure. A panicking hook is treated as not having handled the
    /// message; it must never take down the message loop. The
    /// isolation requires unwinding panics and is lost under
    /// `panic = "abort"`.
    pub fn dispatch(&mut self, msg: &WindowMessage) -> Option<isize> {
        for (_, hook) in &mut self.hooks {
            let outcome = catch_unwind(AssertUnwindSafe(|| hook.try_handle(msg)));
            match outcome {
                Ok(Some(result)) => return Some(result),
                Ok(None) => {}
                Err(_) => {
                    crate::log_error!("message hook panicked on message 0x{:X}", msg.id);
                }
            }
        }
        None
    }
}
