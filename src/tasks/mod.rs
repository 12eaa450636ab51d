//! Embassy tasks module
//!
//! Contains all async tasks for the firmware, organised by functionality.

pub mod ble;
pub mod command;
pub mod serial;

pub use ble::ble_task;
pub use command::command_task;
pub use serial::serial_reader_task;
