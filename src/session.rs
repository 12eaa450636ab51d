//! Connection session state
//!
//! One physical link is supported at a time. The event dispatcher is the
//! only writer of the session; other tasks read copies of it through
//! [`SharedSession`].

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::gatt::{ATT_OVERHEAD, CCCD_DISABLE, CCCD_ENABLE, DEFAULT_MTU};

/// Lifecycle of the BLE link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Attribute table not registered yet
    Idle,
    /// Registered and waiting for a central
    Advertising,
    /// A central is connected
    Connected,
}

/// State of the active link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    connected: bool,
    notify_enabled: bool,
    mtu: u16,
    link_id: u16,
    transport_id: u16,
}

impl Session {
    /// Session of a device with no peer
    pub const fn new() -> Self {
        Self {
            connected: false,
            notify_enabled: false,
            mtu: DEFAULT_MTU,
            link_id: 0,
            transport_id: 0,
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn notify_enabled(&self) -> bool {
        self.notify_enabled
    }

    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    /// Connection identifier used to address notifications
    pub fn link_id(&self) -> u16 {
        self.link_id
    }

    /// Identifier of the GATT interface the link belongs to
    pub fn transport_id(&self) -> u16 {
        self.transport_id
    }

    /// True when serial data may be notified to the peer
    pub fn can_notify(&self) -> bool {
        self.connected && self.notify_enabled
    }

    /// Largest payload carried by one notification
    pub fn chunk_size(&self) -> usize {
        (self.mtu - ATT_OVERHEAD) as usize
    }

    /// A central connected
    pub fn on_connect(&mut self, link_id: u16, transport_id: u16) {
        self.connected = true;
        self.link_id = link_id;
        self.transport_id = transport_id;
    }

    /// The central went away; everything returns to defaults
    pub fn on_disconnect(&mut self) {
        *self = Self::new();
    }

    /// The peer negotiated a new ATT MTU
    ///
    /// Values below the protocol minimum are raised to it.
    pub fn on_mtu_negotiated(&mut self, mtu: u16) {
        self.mtu = mtu.max(DEFAULT_MTU);
    }

    /// The peer wrote the data notify configuration descriptor
    ///
    /// Only the exact enable and disable values change state; anything
    /// else is ignored. Returns true if the value was recognised.
    pub fn on_notify_config_write(&mut self, value: &[u8]) -> bool {
        if value == &CCCD_ENABLE[..] {
            self.notify_enabled = true;
            true
        } else if value == &CCCD_DISABLE[..] {
            self.notify_enabled = false;
            true
        } else {
            false
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Session copy readable from any task
///
/// Written by the dispatcher after each transition, read by the serial
/// task before sending.
pub struct SharedSession<M: RawMutex> {
    inner: Mutex<M, Cell<Session>>,
}

impl<M: RawMutex> SharedSession<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Cell::new(Session::new())),
        }
    }

    /// Replace the published session
    pub fn publish(&self, session: Session) {
        self.inner.lock(|cell| cell.set(session));
    }

    /// Copy of the latest published session
    pub fn snapshot(&self) -> Session {
        self.inner.lock(|cell| cell.get())
    }
}

impl<M: RawMutex> Default for SharedSession<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_defaults() {
        let session = Session::new();

        assert!(!session.connected());
        assert!(!session.notify_enabled());
        assert_eq!(session.mtu(), 23);
        assert_eq!(session.chunk_size(), 20);
    }

    #[test]
    fn test_connect_stores_identifiers() {
        let mut session = Session::new();
        session.on_connect(7, 3);

        assert!(session.connected());
        assert_eq!(session.link_id(), 7);
        assert_eq!(session.transport_id(), 3);
        assert!(!session.can_notify());
    }

    #[test]
    fn test_notify_enable_then_disable() {
        let mut session = Session::new();
        session.on_connect(0, 0);

        assert!(session.on_notify_config_write(&[0x01, 0x00]));
        assert!(session.notify_enabled());
        assert!(session.can_notify());

        assert!(session.on_notify_config_write(&[0x00, 0x00]));
        assert!(!session.notify_enabled());
    }

    #[test]
    fn test_malformed_config_writes_ignored() {
        let mut session = Session::new();
        session.on_notify_config_write(&[0x01, 0x00]);

        // Wrong length
        assert!(!session.on_notify_config_write(&[0x01]));
        assert!(session.notify_enabled());
        assert!(!session.on_notify_config_write(&[0x00, 0x00, 0x00]));
        assert!(session.notify_enabled());

        // Unrecognised 2-byte values (indications, garbage)
        assert!(!session.on_notify_config_write(&[0x02, 0x00]));
        assert!(!session.on_notify_config_write(&[0x00, 0x01]));
        assert!(session.notify_enabled());
    }

    #[test]
    fn test_short_config_write_keeps_disabled_state() {
        let mut session = Session::new();

        session.on_notify_config_write(&[0x01]);
        assert!(!session.notify_enabled());
    }

    #[test]
    fn test_mtu_negotiation() {
        let mut session = Session::new();

        session.on_mtu_negotiated(247);
        assert_eq!(session.mtu(), 247);
        assert_eq!(session.chunk_size(), 244);

        session.on_mtu_negotiated(517);
        assert_eq!(session.mtu(), 517);
    }

    #[test]
    fn test_mtu_floor() {
        let mut session = Session::new();

        session.on_mtu_negotiated(5);
        assert_eq!(session.mtu(), 23);
    }

    #[test]
    fn test_disconnect_resets_everything() {
        let mut session = Session::new();
        session.on_connect(4, 2);
        session.on_mtu_negotiated(185);
        session.on_notify_config_write(&[0x01, 0x00]);

        session.on_disconnect();

        assert_eq!(session, Session::new());
    }

    #[test]
    fn test_shared_session_snapshot() {
        let shared: SharedSession<NoopRawMutex> = SharedSession::new();
        assert_eq!(shared.snapshot(), Session::new());

        let mut session = Session::new();
        session.on_connect(1, 0);
        shared.publish(session);

        assert!(shared.snapshot().connected());
    }
}
