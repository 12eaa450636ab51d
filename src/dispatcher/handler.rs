//! Link event dispatcher
//!
//! The [`Bridge`] owns every piece of per-link state: the attribute table,
//! the session and the reassembly buffer. The BLE task feeds it one
//! [`LinkEvent`] at a time; each event is routed by the slot its handle
//! resolves to. Other tasks only see the session through [`SharedSession`].

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::Write;

use crate::ble::table::{AttributeSlot, AttributeTable, SlotRole};
use crate::ble::traits::GattControl;
use crate::commands::{CommandBuffer, CommandQueue};
use crate::config::advertising;
use crate::dispatcher::events::LinkEvent;
use crate::error::BridgeError;
use crate::protocol::reassembly::ReassemblyBuffer;
use crate::serial::traits::SerialError;
use crate::session::{LinkState, Session, SharedSession};

/// BLE to serial bridge state machine
pub struct Bridge<'a, M: RawMutex, const N: usize> {
    table: Option<AttributeTable>,
    session: Session,
    state: LinkState,
    reassembly: ReassemblyBuffer,
    shared: &'a SharedSession<M>,
    commands: &'a CommandQueue<M, N>,
}

impl<'a, M: RawMutex, const N: usize> Bridge<'a, M, N> {
    /// Create an unregistered bridge publishing to `shared`
    pub fn new(shared: &'a SharedSession<M>, commands: &'a CommandQueue<M, N>) -> Self {
        Self {
            table: None,
            session: Session::new(),
            state: LinkState::Idle,
            reassembly: ReassemblyBuffer::new(),
            shared,
            commands,
        }
    }

    /// Register the service and start advertising
    ///
    /// Registration failures are fatal and come back as
    /// [`BridgeError::Registration`]; nothing is retried.
    pub async fn start<C: GattControl>(&mut self, control: &mut C) -> Result<(), BridgeError> {
        control.set_device_name(advertising::DEVICE_NAME).await?;
        control.set_advertisement_payload(&advertising::PAYLOAD).await?;

        let handles = control
            .register_attribute_table(&AttributeSlot::ALL)
            .await
            .map_err(BridgeError::Registration)?;
        let table = AttributeTable::from_handles(&handles).map_err(|e| {
            log::error!("Bridge: registration returned {} handles", handles.len());
            BridgeError::Registration(e)
        })?;

        let service = table.handle(AttributeSlot::Service);
        control
            .start_service(service)
            .await
            .map_err(BridgeError::Registration)?;
        self.table = Some(table);
        log::info!("Bridge: service registered at handle {}", service);

        control.start_advertising().await?;
        self.state = LinkState::Advertising;
        log::info!("Bridge: advertising as {}", advertising::DEVICE_NAME);

        Ok(())
    }

    /// Handle one link event
    ///
    /// `writer` receives data-channel bytes, `delay` bounds the command
    /// queue wait. Errors are per-event; the bridge stays usable.
    pub async fn dispatch<C, W, D>(
        &mut self,
        event: LinkEvent<'_>,
        control: &mut C,
        writer: &mut W,
        delay: &mut D,
    ) -> Result<(), BridgeError>
    where
        C: GattControl,
        W: Write,
        D: DelayNs,
    {
        match event {
            LinkEvent::Connect { link_id, .. } if self.state == LinkState::Idle => {
                log::warn!("Bridge: connect on link {} before registration ignored", link_id);
                Ok(())
            }
            LinkEvent::Connect { link_id, transport_id } => {
                self.session.on_connect(link_id, transport_id);
                self.state = LinkState::Connected;
                self.publish();
                log::info!("Bridge: connected, link {}", link_id);
                Ok(())
            }
            LinkEvent::Disconnect => {
                self.session.on_disconnect();
                if !self.reassembly.is_idle() {
                    log::warn!("Bridge: discarding {} staged bytes", self.reassembly.len());
                }
                self.reassembly.cancel();
                self.publish();
                self.state = LinkState::Advertising;
                log::info!("Bridge: disconnected, advertising again");
                control.restart_advertising().await?;
                Ok(())
            }
            LinkEvent::MtuNegotiated(mtu) => {
                self.session.on_mtu_negotiated(mtu);
                self.publish();
                log::info!("Bridge: MTU {}", self.session.mtu());
                Ok(())
            }
            LinkEvent::Write { handle, data, prepared } => {
                self.on_write(handle, data, prepared, writer, delay).await
            }
            LinkEvent::Read { handle } => {
                if self.resolve(handle) == Some(AttributeSlot::StatusValue) {
                    log::debug!("Bridge: status read");
                }
                Ok(())
            }
            LinkEvent::ExecuteWrite { commit: true } => {
                let len = self.reassembly.commit(writer).await?;
                if len > 0 {
                    log::debug!("Bridge: long write of {} bytes delivered", len);
                }
                Ok(())
            }
            LinkEvent::ExecuteWrite { commit: false } => {
                self.reassembly.cancel();
                log::debug!("Bridge: long write cancelled");
                Ok(())
            }
        }
    }

    async fn on_write<W: Write, D: DelayNs>(
        &mut self,
        handle: u16,
        data: &[u8],
        prepared: bool,
        writer: &mut W,
        delay: &mut D,
    ) -> Result<(), BridgeError> {
        let Some(slot) = self.resolve(handle) else {
            return Ok(());
        };

        match (slot.role(), prepared) {
            (SlotRole::DataInput, true) => {
                self.reassembly.append(data)?;
            }
            (SlotRole::DataInput, false) => {
                writer
                    .write_all(data)
                    .await
                    .map_err(|_| BridgeError::Serial(SerialError::WriteError))?;
            }
            (SlotRole::Command, false) => {
                let command = CommandBuffer::from_write(data)?;
                self.commands.enqueue(command, delay).await?;
            }
            (SlotRole::Config, false) if slot == AttributeSlot::DataNotifyConfig => {
                if self.session.on_notify_config_write(data) {
                    self.publish();
                    let state = if self.session.notify_enabled() { "on" } else { "off" };
                    log::info!("Bridge: notifications {}", state);
                } else {
                    log::debug!("Bridge: ignoring config value {:02x?}", data);
                }
            }
            (SlotRole::Config, false) => {
                log::debug!("Bridge: status config write ignored");
            }
            _ => {
                log::debug!("Bridge: write to {:?} ignored", slot);
            }
        }

        Ok(())
    }

    fn resolve(&self, handle: u16) -> Option<AttributeSlot> {
        self.table.as_ref().and_then(|table| table.resolve(handle))
    }

    fn publish(&self) {
        self.shared.publish(self.session);
    }

    /// Current link state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Attribute table, once registered
    pub fn table(&self) -> Option<&AttributeTable> {
        self.table.as_ref()
    }

    /// Handle that outbound serial data is notified on
    pub fn notify_handle(&self) -> Option<u16> {
        self.table
            .as_ref()
            .map(|table| table.handle(AttributeSlot::DataNotifyValue))
    }

    /// Staged long write
    pub fn reassembly(&self) -> &ReassemblyBuffer {
        &self.reassembly
    }
}
