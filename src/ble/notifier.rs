//! Notification relay between tasks
//!
//! The BLE connection is owned by the BLE task, but serial data is read on
//! its own task. [`ChannelNotifier`] lets the serial side "notify" by
//! queueing the bytes; the BLE task pops them and sends them on the live
//! connection.

use core::future::poll_fn;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use heapless::Vec;

use crate::ble::traits::{GattNotifier, TransportError};
use crate::config::gatt::DATA_MAX_LEN;
use crate::session::{Session, SharedSession};

/// One queued notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub link_id: u16,
    pub handle: u16,
    pub data: Vec<u8, DATA_MAX_LEN>,
}

impl Notification {
    /// True if this may go out on `link_id` given the current session
    pub fn deliverable(&self, session: &Session, link_id: u16) -> bool {
        session.can_notify() && self.link_id == link_id && session.link_id() == link_id
    }
}

/// Channel carrying notifications to the BLE task
pub type NotificationChannel<M, const N: usize> = Channel<M, Notification, N>;

/// [`GattNotifier`] that forwards to a [`NotificationChannel`]
///
/// Waits for space, so a slow link pushes back on the serial reader. The
/// session is checked once space is available: a notification for a link
/// that dropped while waiting fails with [`TransportError::NotConnected`]
/// instead of being queued for whoever connects next.
pub struct ChannelNotifier<'a, M: RawMutex, const N: usize> {
    channel: &'a NotificationChannel<M, N>,
    session: &'a SharedSession<M>,
}

impl<'a, M: RawMutex, const N: usize> ChannelNotifier<'a, M, N> {
    pub fn new(channel: &'a NotificationChannel<M, N>, session: &'a SharedSession<M>) -> Self {
        Self { channel, session }
    }
}

impl<M: RawMutex, const N: usize> GattNotifier for ChannelNotifier<'_, M, N> {
    async fn notify(&mut self, link_id: u16, handle: u16, data: &[u8]) -> Result<(), TransportError> {
        let data = Vec::from_slice(data).map_err(|_| TransportError::NotifyFailed)?;
        let mut notification = Notification { link_id, handle, data };

        loop {
            poll_fn(|cx| self.channel.poll_ready_to_send(cx)).await;

            let session = self.session.snapshot();
            if !session.can_notify() || session.link_id() != link_id {
                return Err(TransportError::NotConnected);
            }

            match self.channel.try_send(notification) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(pending)) => notification = pending,
            }
        }
    }
}

/// Throw away queued notifications
///
/// Called when the link drops so stale data is not sent to the next peer.
pub fn discard_pending<M: RawMutex, const N: usize>(channel: &NotificationChannel<M, N>) -> usize {
    let mut count = 0;
    while channel.try_receive().is_ok() {
        count += 1;
    }
    count
}
