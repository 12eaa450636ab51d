//! BLE task
//!
//! Runs the trouble-host stack, registers the SPP service and feeds every
//! connection event to the [`Bridge`]. Notifications queued by the serial
//! task are sent from here since this task owns the connection.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Delay;
use embedded_io_async::Write;
use trouble_host::att::{AttClient, AttReq};
use trouble_host::prelude::*;

use crate::ble::notifier::{discard_pending, Notification};
use crate::ble::service::SppService;
use crate::ble::table::AttributeSlot;
use crate::ble::traits::{GattControl, HandleList, TransportError};
use crate::config::advertising::MAX_PAYLOAD_LEN;
use crate::config::queue::COMMAND_QUEUE_DEPTH;
use crate::config::gatt::SLOT_COUNT;
use crate::dispatcher::{Bridge, LinkEvent, COMMAND_QUEUE, NOTIFY_CHANNEL, NOTIFY_HANDLE, SESSION};

/// Number of maximum concurrent connections
const CONNECTIONS_MAX: usize = 1;
/// Number of L2CAP channels
const L2CAP_CHANNELS_MAX: usize = 3;

type DeviceBridge = Bridge<'static, CriticalSectionRawMutex, COMMAND_QUEUE_DEPTH>;

/// BLE GATT server with the SPP service
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
struct Server {
    spp: SppService,
}

/// [`GattControl`] backed by a trouble-host server
///
/// trouble builds the attribute table when the server is created and
/// advertises from the task loop, so most calls here record what the
/// bridge asked for and the loop acts on it.
struct TroubleControl<'a, 'v> {
    server: &'a Server<'v>,
    adv_data: [u8; MAX_PAYLOAD_LEN],
    adv_len: usize,
    advertise: bool,
}

impl<'a, 'v> TroubleControl<'a, 'v> {
    fn new(server: &'a Server<'v>) -> Self {
        Self {
            server,
            adv_data: [0u8; MAX_PAYLOAD_LEN],
            adv_len: 0,
            advertise: false,
        }
    }

    fn adv_payload(&self) -> &[u8] {
        &self.adv_data[..self.adv_len]
    }

    fn take_advertise_request(&mut self) -> bool {
        core::mem::take(&mut self.advertise)
    }
}

impl GattControl for TroubleControl<'_, '_> {
    async fn set_device_name(&mut self, name: &str) -> Result<(), TransportError> {
        // The GAP name is fixed when the server is built
        log::debug!("BLE: device name '{}'", name);
        Ok(())
    }

    async fn set_advertisement_payload(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(TransportError::AdvertisingFailed);
        }
        self.adv_data[..payload.len()].copy_from_slice(payload);
        self.adv_len = payload.len();
        Ok(())
    }

    async fn register_attribute_table(&mut self, slots: &[AttributeSlot]) -> Result<HandleList, TransportError> {
        if slots.len() != SLOT_COUNT {
            return Err(TransportError::RegistrationFailed);
        }
        self.server.spp.handles()
    }

    async fn start_service(&mut self, service_handle: u16) -> Result<(), TransportError> {
        log::debug!("BLE: service {} live", service_handle);
        Ok(())
    }

    async fn start_advertising(&mut self) -> Result<(), TransportError> {
        self.advertise = true;
        Ok(())
    }

    async fn restart_advertising(&mut self) -> Result<(), TransportError> {
        self.advertise = true;
        Ok(())
    }
}

/// Main BLE task
///
/// 1. Builds the host stack and GATT server
/// 2. Registers the service through the bridge and publishes the notify handle
/// 3. Advertises, accepts one connection at a time and dispatches its events
/// 4. Sends notifications queued by the serial task
pub async fn ble_task<C: Controller, W: Write>(controller: C, mut uart_tx: W, address: [u8; 6]) {
    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();

    let stack = trouble_host::new(controller, &mut resources).set_random_address(Address::random(address));

    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: crate::config::advertising::DEVICE_NAME,
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(_) => {
            log::error!("BLE: GATT server could not be built");
            return;
        }
    };

    let runner_task = runner.run();

    let peripheral_task = async {
        let mut control = TroubleControl::new(&server);
        let mut bridge: DeviceBridge = Bridge::new(&SESSION, &COMMAND_QUEUE);
        let mut delay = Delay;

        if let Err(e) = bridge.start(&mut control).await {
            log::error!("BLE: startup failed: {:?}", e);
            return;
        }
        if let Some(handle) = bridge.notify_handle() {
            NOTIFY_HANDLE.signal(handle);
        }

        loop {
            if !control.take_advertise_request() {
                log::warn!("BLE: advertising not requested, advertising anyway");
            }

            let advertiser = match peripheral
                .advertise(
                    &Default::default(),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: control.adv_payload(),
                        scan_data: &[],
                    },
                )
                .await
            {
                Ok(a) => a,
                Err(_) => {
                    control.advertise = true;
                    continue;
                }
            };

            let conn = match advertiser.accept().await {
                Ok(acceptor) => match acceptor.with_attribute_server(&*server) {
                    Ok(c) => c,
                    Err(_) => {
                        control.advertise = true;
                        continue;
                    }
                },
                Err(_) => {
                    control.advertise = true;
                    continue;
                }
            };

            let link_id = conn.raw().handle().raw();
            let stale = discard_pending(&NOTIFY_CHANNEL);
            if stale > 0 {
                log::debug!("BLE: dropped {} notifications queued while advertising", stale);
            }
            dispatch(
                &mut bridge,
                LinkEvent::Connect { link_id, transport_id: 0 },
                &mut control,
                &mut uart_tx,
                &mut delay,
            )
            .await;

            let mut mtu = 0;
            loop {
                let current = conn.raw().att_mtu();
                if current != mtu {
                    mtu = current;
                    dispatch(&mut bridge, LinkEvent::MtuNegotiated(mtu), &mut control, &mut uart_tx, &mut delay).await;
                }

                match select(conn.next(), NOTIFY_CHANNEL.receive()).await {
                    Either::First(GattConnectionEvent::Disconnected { reason }) => {
                        log::info!("BLE: disconnected ({:?})", reason);
                        dispatch(&mut bridge, LinkEvent::Disconnect, &mut control, &mut uart_tx, &mut delay).await;
                        let stale = discard_pending(&NOTIFY_CHANNEL);
                        if stale > 0 {
                            log::debug!("BLE: dropped {} queued notifications", stale);
                        }
                        break;
                    }
                    Either::First(GattConnectionEvent::Gatt { event }) => {
                        handle_gatt_event(&mut bridge, event, &mut control, &mut uart_tx, &mut delay).await;
                    }
                    Either::First(_) => {}
                    Either::Second(notification) => {
                        send_notification(&server, &conn, &notification).await;
                    }
                }
            }
        }
    };

    select(runner_task, peripheral_task).await;
}

/// Dispatch one event and log what went wrong
async fn dispatch<W: Write>(
    bridge: &mut DeviceBridge,
    event: LinkEvent<'_>,
    control: &mut TroubleControl<'_, '_>,
    writer: &mut W,
    delay: &mut Delay,
) {
    if let Err(e) = bridge.dispatch(event, control, writer, delay).await {
        log::warn!("BLE: event dropped: {:?}", e);
    }
}

/// Translate a trouble GATT event, dispatch it, then let the server reply
async fn handle_gatt_event<P: PacketPool, W: Write>(
    bridge: &mut DeviceBridge,
    event: GattEvent<'_, '_, P>,
    control: &mut TroubleControl<'_, '_>,
    writer: &mut W,
    delay: &mut Delay,
) {
    match event {
        GattEvent::Write(write_event) => {
            let link_event = LinkEvent::Write {
                handle: write_event.handle(),
                data: write_event.data(),
                prepared: false,
            };
            dispatch(bridge, link_event, control, writer, delay).await;
            let _ = write_event.accept();
        }
        GattEvent::Read(read_event) => {
            dispatch(bridge, LinkEvent::Read { handle: read_event.handle() }, control, writer, delay).await;
            let _ = read_event.accept();
        }
        GattEvent::Other(other_event) => {
            match other_event.payload().incoming() {
                AttClient::Request(AttReq::PrepareWrite { handle, value, .. }) => {
                    let link_event = LinkEvent::Write {
                        handle,
                        data: value,
                        prepared: true,
                    };
                    dispatch(bridge, link_event, control, writer, delay).await;
                }
                AttClient::Request(AttReq::ExecuteWrite { flags }) => {
                    let link_event = LinkEvent::ExecuteWrite { commit: flags == 0x01 };
                    dispatch(bridge, link_event, control, writer, delay).await;
                }
                _ => {}
            }
            let _ = other_event.accept();
        }
    }
}

/// Send one queued notification on the live connection
///
/// Notifications addressed to another link, or arriving while the peer
/// is not subscribed, are dropped.
async fn send_notification<P: PacketPool>(
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
    notification: &Notification,
) {
    let link_id = conn.raw().handle().raw();
    if !notification.deliverable(&SESSION.snapshot(), link_id) {
        log::debug!(
            "BLE: dropping {} bytes queued for link {} (live link {})",
            notification.data.len(),
            notification.link_id,
            link_id
        );
        return;
    }

    let characteristic = &server.spp.data_notify;
    if notification.handle != characteristic.handle {
        log::warn!("BLE: no notifier for handle {}", notification.handle);
        return;
    }

    if characteristic.notify(conn, &notification.data).await.is_err() {
        log::warn!("BLE: notification of {} bytes failed", notification.data.len());
    }
}
