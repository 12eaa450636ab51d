//! Attribute index table
//!
//! The SPP service is registered as a fixed, ordered list of eleven slots.
//! After registration the stack hands back one opaque handle per slot; this
//! module keeps that mapping and resolves incoming handles back to slots.

use crate::ble::traits::TransportError;
use crate::config::gatt::SLOT_COUNT;

/// Logical slot of the SPP service, in registration order
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSlot {
    /// Primary service declaration
    Service = 0,
    /// Data receive characteristic declaration
    DataRecvDecl = 1,
    /// Data receive value (peer writes serial data here)
    DataRecvValue = 2,
    /// Data notify characteristic declaration
    DataNotifyDecl = 3,
    /// Data notify value (serial data is notified from here)
    DataNotifyValue = 4,
    /// Data notify client configuration descriptor
    DataNotifyConfig = 5,
    /// Command characteristic declaration
    CommandDecl = 6,
    /// Command value (peer writes control messages here)
    CommandValue = 7,
    /// Status characteristic declaration
    StatusDecl = 8,
    /// Status value
    StatusValue = 9,
    /// Status client configuration descriptor
    StatusConfig = 10,
}

impl AttributeSlot {
    /// All slots in registration order
    pub const ALL: [AttributeSlot; SLOT_COUNT] = [
        AttributeSlot::Service,
        AttributeSlot::DataRecvDecl,
        AttributeSlot::DataRecvValue,
        AttributeSlot::DataNotifyDecl,
        AttributeSlot::DataNotifyValue,
        AttributeSlot::DataNotifyConfig,
        AttributeSlot::CommandDecl,
        AttributeSlot::CommandValue,
        AttributeSlot::StatusDecl,
        AttributeSlot::StatusValue,
        AttributeSlot::StatusConfig,
    ];

    /// Position of this slot in the registration order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Handler category of this slot
    pub fn role(self) -> SlotRole {
        match self {
            AttributeSlot::DataRecvValue => SlotRole::DataInput,
            AttributeSlot::DataNotifyValue => SlotRole::DataOutput,
            AttributeSlot::CommandValue => SlotRole::Command,
            AttributeSlot::StatusValue => SlotRole::Status,
            AttributeSlot::DataNotifyConfig | AttributeSlot::StatusConfig => SlotRole::Config,
            AttributeSlot::Service
            | AttributeSlot::DataRecvDecl
            | AttributeSlot::DataNotifyDecl
            | AttributeSlot::CommandDecl
            | AttributeSlot::StatusDecl => SlotRole::Declaration,
        }
    }
}

/// What a slot is used for by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Declaration,
    DataInput,
    DataOutput,
    Command,
    Status,
    Config,
}

/// Mapping from runtime handles to logical slots
///
/// Built once per registration cycle. Reconnects keep the mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTable {
    handles: [u16; SLOT_COUNT],
}

impl AttributeTable {
    /// Build the table from the handle list returned by registration
    ///
    /// The list must contain exactly one handle per slot, in slot order.
    pub fn from_handles(handles: &[u16]) -> Result<Self, TransportError> {
        let handles: [u16; SLOT_COUNT] = handles
            .try_into()
            .map_err(|_| TransportError::HandleCountMismatch)?;
        Ok(Self { handles })
    }

    /// Resolve a handle to its slot
    ///
    /// Returns `None` for handles outside this service.
    pub fn resolve(&self, handle: u16) -> Option<AttributeSlot> {
        self.handles
            .iter()
            .position(|&h| h == handle)
            .map(|i| AttributeSlot::ALL[i])
    }

    /// Runtime handle of a slot
    pub fn handle(&self, slot: AttributeSlot) -> u16 {
        self.handles[slot.index()]
    }

    /// Handle list in slot order
    pub fn handles(&self) -> &[u16; SLOT_COUNT] {
        &self.handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HANDLES: [u16; SLOT_COUNT] = [40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 50];

    #[test]
    fn test_resolve_every_registered_handle() {
        let table = AttributeTable::from_handles(&HANDLES).unwrap();

        for (i, &handle) in HANDLES.iter().enumerate() {
            assert_eq!(table.resolve(handle), Some(AttributeSlot::ALL[i]));
        }
    }

    #[test]
    fn test_resolve_unknown_handles() {
        let table = AttributeTable::from_handles(&HANDLES).unwrap();

        assert_eq!(table.resolve(0), None);
        assert_eq!(table.resolve(39), None);
        assert_eq!(table.resolve(51), None);
        assert_eq!(table.resolve(u16::MAX), None);
    }

    #[test]
    fn test_handle_lookup_honours_slot() {
        let table = AttributeTable::from_handles(&HANDLES).unwrap();

        assert_eq!(table.handle(AttributeSlot::Service), 40);
        assert_eq!(table.handle(AttributeSlot::DataNotifyValue), 44);
        assert_eq!(table.handle(AttributeSlot::StatusConfig), 50);
    }

    #[test]
    fn test_wrong_handle_count_rejected() {
        assert_eq!(
            AttributeTable::from_handles(&HANDLES[..10]),
            Err(TransportError::HandleCountMismatch)
        );
        assert_eq!(
            AttributeTable::from_handles(&[]),
            Err(TransportError::HandleCountMismatch)
        );
    }

    #[test]
    fn test_slot_order_matches_discriminants() {
        for (i, slot) in AttributeSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
    }

    #[test]
    fn test_slot_roles() {
        assert_eq!(AttributeSlot::DataRecvValue.role(), SlotRole::DataInput);
        assert_eq!(AttributeSlot::CommandValue.role(), SlotRole::Command);
        assert_eq!(AttributeSlot::DataNotifyConfig.role(), SlotRole::Config);
        assert_eq!(AttributeSlot::StatusConfig.role(), SlotRole::Config);
        assert_eq!(AttributeSlot::CommandDecl.role(), SlotRole::Declaration);
    }
}
