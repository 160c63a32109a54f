/// Hidden message window hosting a hook chain.
pub mod message_window;

/// Process utilities (alive check).
pub mod process;

/// Restart registration for the current process.
pub mod recovery;

/// Restart Manager backend.
pub mod rm;

/// UTF-16 helpers.
mod strings;

pub use message_window::MessageWindowHandle;
pub use rm::RmService;
