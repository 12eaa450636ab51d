//! GATT transport traits for abstraction and testability
//!
//! The bridge core never talks to a BLE stack directly. Registration,
//! advertising control and notifications go through these traits so the
//! real trouble-host glue can be swapped with a mock for testing.

use core::future::Future;

use heapless::Vec;

use crate::ble::table::AttributeSlot;
use crate::config::gatt::SLOT_COUNT;

/// Errors reported by the GATT transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The stack refused to create the attribute table
    RegistrationFailed,
    /// Registration returned a handle list of the wrong size
    HandleCountMismatch,
    /// A notification could not be queued
    NotifyFailed,
    /// Advertising could not be configured or started
    AdvertisingFailed,
    /// No link is available for the operation
    NotConnected,
}

/// Handle list returned by attribute table registration
pub type HandleList = Vec<u16, SLOT_COUNT>;

/// Server-initiated delivery of bytes to the connected peer
pub trait GattNotifier {
    /// Notify `data` on the attribute `handle` of link `link_id`
    ///
    /// Fire-and-forget: no acknowledgement from the peer is awaited.
    fn notify(
        &mut self,
        link_id: u16,
        handle: u16,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>>;
}

/// Registration and advertising control of the GATT stack
pub trait GattControl {
    /// Set the GAP device name
    fn set_device_name(&mut self, name: &str) -> impl Future<Output = Result<(), TransportError>>;

    /// Set the raw advertisement payload
    fn set_advertisement_payload(
        &mut self,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>>;

    /// Register the attribute table and return one handle per slot
    fn register_attribute_table(
        &mut self,
        slots: &[AttributeSlot],
    ) -> impl Future<Output = Result<HandleList, TransportError>>;

    /// Start the registered service
    fn start_service(&mut self, service_handle: u16) -> impl Future<Output = Result<(), TransportError>>;

    /// Start advertising
    fn start_advertising(&mut self) -> impl Future<Output = Result<(), TransportError>>;

    /// Restart advertising after the link went down
    fn restart_advertising(&mut self) -> impl Future<Output = Result<(), TransportError>>;
}

#[cfg(test)]
pub mod mock {
    //! Mock GATT transport for testing

    use super::*;
    use core::cell::RefCell;
    use std::string::String;
    use std::vec::Vec as StdVec;

    /// A recorded notification
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentNotification {
        pub link_id: u16,
        pub handle: u16,
        pub data: StdVec<u8>,
    }

    /// A recorded control call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ControlCall {
        SetDeviceName(String),
        SetAdvertisementPayload(StdVec<u8>),
        RegisterAttributeTable(usize),
        StartService(u16),
        StartAdvertising,
        RestartAdvertising,
    }

    /// Mock GATT transport for unit testing
    pub struct MockTransport {
        /// Handles returned by register_attribute_table()
        handles: HandleList,
        /// Record of notifications
        notifications: RefCell<StdVec<SentNotification>>,
        /// Record of control calls
        calls: RefCell<StdVec<ControlCall>>,
        /// Error to return from the next registration
        registration_error: RefCell<Option<TransportError>>,
        /// Error to return from the notify call with this index
        notify_error_at: RefCell<Option<usize>>,
    }

    impl MockTransport {
        /// Create a mock that assigns handles starting at `first_handle`
        pub fn new(first_handle: u16) -> Self {
            let handles = (0..SLOT_COUNT as u16).map(|i| first_handle + i).collect();
            Self::with_handles(handles)
        }

        /// Create a mock returning an explicit handle list
        pub fn with_handles(handles: HandleList) -> Self {
            Self {
                handles,
                notifications: RefCell::new(StdVec::new()),
                calls: RefCell::new(StdVec::new()),
                registration_error: RefCell::new(None),
                notify_error_at: RefCell::new(None),
            }
        }

        /// Fail the next registration with `error`
        pub fn fail_registration(&self, error: TransportError) {
            *self.registration_error.borrow_mut() = Some(error);
        }

        /// Fail the notify call with the given zero-based index
        pub fn fail_notify_at(&self, index: usize) {
            *self.notify_error_at.borrow_mut() = Some(index);
        }

        /// All notifications sent so far
        pub fn notifications(&self) -> StdVec<SentNotification> {
            self.notifications.borrow().clone()
        }

        /// All control calls made so far
        pub fn calls(&self) -> StdVec<ControlCall> {
            self.calls.borrow().clone()
        }

        /// Forget recorded notifications and calls
        pub fn clear(&self) {
            self.notifications.borrow_mut().clear();
            self.calls.borrow_mut().clear();
        }
    }

    impl GattNotifier for MockTransport {
        async fn notify(&mut self, link_id: u16, handle: u16, data: &[u8]) -> Result<(), TransportError> {
            let index = self.notifications.borrow().len();
            if *self.notify_error_at.borrow() == Some(index) {
                self.notify_error_at.borrow_mut().take();
                return Err(TransportError::NotifyFailed);
            }

            self.notifications.borrow_mut().push(SentNotification {
                link_id,
                handle,
                data: data.to_vec(),
            });
            Ok(())
        }
    }

    impl GattControl for MockTransport {
        async fn set_device_name(&mut self, name: &str) -> Result<(), TransportError> {
            self.calls.borrow_mut().push(ControlCall::SetDeviceName(name.into()));
            Ok(())
        }

        async fn set_advertisement_payload(&mut self, payload: &[u8]) -> Result<(), TransportError> {
            self.calls
                .borrow_mut()
                .push(ControlCall::SetAdvertisementPayload(payload.to_vec()));
            Ok(())
        }

        async fn register_attribute_table(
            &mut self,
            slots: &[AttributeSlot],
        ) -> Result<HandleList, TransportError> {
            self.calls
                .borrow_mut()
                .push(ControlCall::RegisterAttributeTable(slots.len()));
            if let Some(error) = self.registration_error.borrow_mut().take() {
                return Err(error);
            }
            Ok(self.handles.clone())
        }

        async fn start_service(&mut self, service_handle: u16) -> Result<(), TransportError> {
            self.calls.borrow_mut().push(ControlCall::StartService(service_handle));
            Ok(())
        }

        async fn start_advertising(&mut self) -> Result<(), TransportError> {
            self.calls.borrow_mut().push(ControlCall::StartAdvertising);
            Ok(())
        }

        async fn restart_advertising(&mut self) -> Result<(), TransportError> {
            self.calls.borrow_mut().push(ControlCall::RestartAdvertising);
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_mock_notify_records() {
            let mut transport = MockTransport::new(1);

            futures::executor::block_on(async {
                transport.notify(0, 5, &[0x01, 0x02]).await.unwrap();
            });

            let sent = transport.notifications();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0].handle, 5);
            assert_eq!(sent[0].data, [0x01, 0x02]);
        }

        #[test]
        fn test_mock_notify_error_is_one_shot() {
            let mut transport = MockTransport::new(1);
            transport.fail_notify_at(0);

            futures::executor::block_on(async {
                assert_eq!(
                    transport.notify(0, 5, &[0x01]).await,
                    Err(TransportError::NotifyFailed)
                );
                transport.notify(0, 5, &[0x02]).await.unwrap();
            });

            assert_eq!(transport.notifications().len(), 1);
        }

        #[test]
        fn test_mock_registration_handles() {
            let mut transport = MockTransport::new(40);

            let handles = futures::executor::block_on(
                transport.register_attribute_table(&AttributeSlot::ALL),
            )
            .unwrap();

            assert_eq!(handles.len(), SLOT_COUNT);
            assert_eq!(handles[0], 40);
            assert_eq!(handles[SLOT_COUNT - 1], 50);
        }
    }
}
