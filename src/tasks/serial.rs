//! Serial task
//!
//! Generic over any `embedded_io_async::Read`, so the UART receive half
//! or another byte source can feed the bridge.

use embassy_time::Delay;
use embedded_io_async::Read;

use crate::ble::notifier::ChannelNotifier;
use crate::dispatcher::{NOTIFY_CHANNEL, NOTIFY_HANDLE, SESSION};
use crate::serial::reader::SerialBridge;

/// Task that forwards serial input to the BLE peer
///
/// Waits for the service to be registered, then pumps forever.
pub async fn serial_reader_task<R: Read>(mut reader: R) -> ! {
    let handle = NOTIFY_HANDLE.wait().await;
    log::info!("Serial: forwarding to handle {}", handle);

    let mut notifier = ChannelNotifier::new(&NOTIFY_CHANNEL, &SESSION);
    let mut delay = Delay;

    SerialBridge::new()
        .run(&mut reader, &mut notifier, &mut delay, &SESSION, handle)
        .await
}
