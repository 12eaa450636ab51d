//! SPP-style GATT service definition
//!
//! - Service UUID: 0xABF0
//! - Data receive 0xABF1: write, write without response, up to 512 bytes
//! - Data notify 0xABF2: read, notify, up to 512 bytes
//! - Command 0xABF3: read, write, up to 20 bytes
//! - Status 0xABF4: read, notify, up to 20 bytes
//!
//! The declaration order gives the eleven attributes of
//! [`AttributeSlot::ALL`](crate::ble::table::AttributeSlot::ALL).

use heapless::Vec;
use trouble_host::prelude::*;

use crate::ble::table::AttributeSlot;
use crate::ble::traits::{HandleList, TransportError};
use crate::config::gatt::{COMMAND_MAX_LEN, DATA_MAX_LEN, STATUS_MAX_LEN};

/// Serial port profile service
#[gatt_service(uuid = "abf0")]
pub struct SppService {
    /// Peer to serial data
    #[characteristic(uuid = "abf1", write, write_without_response, value = Vec::new())]
    pub data_recv: Vec<u8, DATA_MAX_LEN>,

    /// Serial to peer data
    #[characteristic(uuid = "abf2", read, notify, value = Vec::new())]
    pub data_notify: Vec<u8, DATA_MAX_LEN>,

    /// Short control messages
    #[characteristic(uuid = "abf3", read, write, value = Vec::new())]
    pub command: Vec<u8, COMMAND_MAX_LEN>,

    /// Device status, reserved
    #[characteristic(uuid = "abf4", read, notify, value = Vec::new())]
    pub status: Vec<u8, STATUS_MAX_LEN>,
}

impl SppService {
    /// Runtime handles in slot order
    ///
    /// A characteristic declaration sits directly before its value.
    pub fn handles(&self) -> Result<HandleList, TransportError> {
        let notify_cccd = self
            .data_notify
            .cccd_handle
            .ok_or(TransportError::RegistrationFailed)?;
        let status_cccd = self
            .status
            .cccd_handle
            .ok_or(TransportError::RegistrationFailed)?;

        let handles = [
            self.handle,
            self.data_recv.handle - 1,
            self.data_recv.handle,
            self.data_notify.handle - 1,
            self.data_notify.handle,
            notify_cccd,
            self.command.handle - 1,
            self.command.handle,
            self.status.handle - 1,
            self.status.handle,
            status_cccd,
        ];
        debug_assert_eq!(handles.len(), AttributeSlot::ALL.len());

        Vec::from_slice(&handles).map_err(|_| TransportError::HandleCountMismatch)
    }
}
