//! Link events delivered by the BLE stack glue

/// One event from the GATT server, already stripped of stack types
///
/// Borrowed data lives only for the duration of the dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent<'a> {
    /// A central connected
    Connect { link_id: u16, transport_id: u16 },
    /// The central disconnected
    Disconnect,
    /// The ATT MTU was exchanged
    MtuNegotiated(u16),
    /// The peer wrote an attribute
    ///
    /// `prepared` is set for prepare-write fragments of a long write.
    Write {
        handle: u16,
        data: &'a [u8],
        prepared: bool,
    },
    /// The peer read an attribute
    Read { handle: u16 },
    /// The peer ended a long write
    ///
    /// `commit` false cancels the staged fragments.
    ExecuteWrite { commit: bool },
}
