//! Bluetooth Low Energy module
//!
//! The attribute table, the transport traits the bridge core talks to, and
//! the notification relay are portable. The trouble-host service definition
//! is only built for the device.

pub mod notifier;
#[cfg(feature = "embedded")]
pub mod service;
pub mod table;
pub mod traits;

pub use notifier::{ChannelNotifier, Notification, NotificationChannel};
#[cfg(feature = "embedded")]
pub use service::SppService;
pub use table::{AttributeSlot, AttributeTable, SlotRole};
pub use traits::{GattControl, GattNotifier, HandleList, TransportError};
