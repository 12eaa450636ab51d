//! Command buffer carried on the control channel
//!
//! The control characteristic accepts short messages (up to 20 bytes).
//! This firmware does not interpret them; each write is copied into a
//! [`CommandBuffer`] and handed to the command consumer.

use heapless::Vec;

use crate::config::gatt::COMMAND_MAX_LEN;
use crate::error::BridgeError;

/// Payload bytes plus the NUL terminator
const COMMAND_BUFFER_LEN: usize = COMMAND_MAX_LEN + 1;

/// Owned copy of one control write
///
/// Always NUL terminated so text consumers never run past the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    bytes: Vec<u8, COMMAND_BUFFER_LEN>,
}

impl CommandBuffer {
    /// Copy a control write
    ///
    /// Writes longer than the characteristic allows are truncated; empty
    /// writes are rejected.
    pub fn from_write(data: &[u8]) -> Result<Self, BridgeError> {
        if data.is_empty() {
            return Err(BridgeError::EmptyCommand);
        }

        let len = data.len().min(COMMAND_MAX_LEN);
        if len < data.len() {
            log::warn!("Command: {} byte write truncated to {}", data.len(), len);
        }

        let mut bytes = Vec::new();
        // Capacity is COMMAND_MAX_LEN + 1, both pushes fit
        let _ = bytes.extend_from_slice(&data[..len]);
        let _ = bytes.push(0);

        Ok(Self { bytes })
    }

    /// Payload without the terminator
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    /// Payload including the terminator
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload up to the first NUL, as a client padding with zeros intends it
    pub fn text(&self) -> &[u8] {
        let payload = self.as_bytes();
        let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
        &payload[..end]
    }

    /// Payload length without the terminator
    pub fn len(&self) -> usize {
        self.bytes.len() - 1
    }

    /// Always false; empty writes never become buffers
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
