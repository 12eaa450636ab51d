//! Link event dispatch and the channels between tasks

pub mod channels;
pub mod events;
pub mod handler;

pub use channels::{COMMAND_QUEUE, NOTIFY_CHANNEL, NOTIFY_HANDLE, SESSION};
pub use events::LinkEvent;
pub use handler::Bridge;
