//! Channels and shared state connecting the firmware tasks
//!
//! The BLE task owns the [`Bridge`](super::Bridge) and is the only writer of
//! [`SESSION`]. The serial task reads the session and queues notifications,
//! the command task drains [`COMMAND_QUEUE`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use crate::ble::notifier::NotificationChannel;
use crate::commands::CommandQueue;
use crate::config::queue::{COMMAND_QUEUE_DEPTH, NOTIFY_QUEUE_DEPTH};
use crate::session::SharedSession;

/// Published copy of the link session
pub static SESSION: SharedSession<CriticalSectionRawMutex> = SharedSession::new();

/// Commands written by the peer, waiting for the consumer
pub static COMMAND_QUEUE: CommandQueue<CriticalSectionRawMutex, COMMAND_QUEUE_DEPTH> = CommandQueue::new();

/// Serial data waiting to be notified by the BLE task
pub static NOTIFY_CHANNEL: NotificationChannel<CriticalSectionRawMutex, NOTIFY_QUEUE_DEPTH> = Channel::new();

/// Raised once registration is done, carrying the data notify handle
pub static NOTIFY_HANDLE: Signal<CriticalSectionRawMutex, u16> = Signal::new();
