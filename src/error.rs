//! Bridge-level error type

use crate::ble::traits::TransportError;
use crate::protocol::reassembly::ReassemblyError;
use crate::serial::traits::SerialError;

/// Errors raised while handling link events
///
/// Only [`BridgeError::Registration`] stops the firmware; every other
/// variant is logged by the caller and the event loop carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// Attribute table registration failed at startup
    Registration(TransportError),
    /// Allocation for a reassembly fragment or buffer failed
    ResourceExhausted,
    /// The command queue stayed full; the command was dropped
    QueueFull,
    /// Control write carried no bytes
    EmptyCommand,
    /// The GATT transport rejected an operation
    Transport(TransportError),
    /// The serial peripheral rejected a write
    Serial(SerialError),
}

impl BridgeError {
    /// True for errors that must abort startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::Registration(_))
    }
}

impl From<TransportError> for BridgeError {
    fn from(error: TransportError) -> Self {
        BridgeError::Transport(error)
    }
}

impl From<ReassemblyError> for BridgeError {
    fn from(error: ReassemblyError) -> Self {
        match error {
            ReassemblyError::OutOfMemory => BridgeError::ResourceExhausted,
            ReassemblyError::WriteFailed => BridgeError::Serial(SerialError::WriteError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_registration_is_fatal() {
        assert!(BridgeError::Registration(TransportError::RegistrationFailed).is_fatal());
        assert!(!BridgeError::ResourceExhausted.is_fatal());
        assert!(!BridgeError::QueueFull.is_fatal());
        assert!(!BridgeError::EmptyCommand.is_fatal());
        assert!(!BridgeError::Transport(TransportError::NotifyFailed).is_fatal());
        assert!(!BridgeError::Serial(SerialError::WriteError).is_fatal());
    }

    #[test]
    fn test_reassembly_error_mapping() {
        assert_eq!(
            BridgeError::from(ReassemblyError::OutOfMemory),
            BridgeError::ResourceExhausted
        );
        assert_eq!(
            BridgeError::from(ReassemblyError::WriteFailed),
            BridgeError::Serial(SerialError::WriteError)
        );
    }
}
