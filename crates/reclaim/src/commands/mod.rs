pub mod init;
pub mod render;
pub mod unlock;
pub mod watch;
pub mod who;
