//! Serial to BLE pump
//!
//! Reads whatever the UART has, checks the published session, and hands
//! the bytes to the fragmenter. Data read while nobody is subscribed is
//! dropped.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;
use embedded_io::ErrorKind;
use embedded_io_async::Read;

use crate::ble::traits::GattNotifier;
use crate::config::serial::READ_CHUNK;
use crate::config::timing::SERIAL_ERROR_BACKOFF_MS;
use crate::error::BridgeError;
use crate::protocol::fragmenter::Fragmenter;
use crate::serial::traits::SerialError;
use crate::session::SharedSession;

/// Result of one pump step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The read returned no bytes
    Idle,
    /// Bytes read while the peer could not receive them
    Dropped(usize),
    /// Bytes notified to the peer
    Sent { bytes: usize, notifications: usize },
}

/// Moves UART input to BLE notifications
pub struct SerialBridge {
    fragmenter: Fragmenter,
    buf: [u8; READ_CHUNK],
}

impl SerialBridge {
    pub fn new() -> Self {
        Self {
            fragmenter: Fragmenter::new(),
            buf: [0u8; READ_CHUNK],
        }
    }

    /// Read once from `reader` and forward the bytes on `handle`
    ///
    /// A read error pauses for the back-off interval before returning so a
    /// stuck peripheral does not spin the executor.
    pub async fn pump_once<R, N, D, M>(
        &mut self,
        reader: &mut R,
        notifier: &mut N,
        delay: &mut D,
        session: &SharedSession<M>,
        handle: u16,
    ) -> Result<PumpOutcome, BridgeError>
    where
        R: Read,
        N: GattNotifier,
        D: DelayNs,
        M: RawMutex,
    {
        let len = match reader.read(&mut self.buf).await {
            Ok(0) => return Ok(PumpOutcome::Idle),
            Ok(n) => n,
            Err(e) => {
                let error = classify(embedded_io::Error::kind(&e));
                log::warn!("Serial: read failed ({:?})", error);
                delay.delay_ms(SERIAL_ERROR_BACKOFF_MS).await;
                return Err(BridgeError::Serial(error));
            }
        };

        // Gate on a fresh copy; the link may have changed during the read
        let snapshot = session.snapshot();
        if !snapshot.can_notify() {
            log::info!("Serial: {} bytes dropped, notifications off", len);
            return Ok(PumpOutcome::Dropped(len));
        }

        let notifications = self
            .fragmenter
            .send(notifier, delay, session, handle, &self.buf[..len])
            .await?;

        Ok(PumpOutcome::Sent { bytes: len, notifications })
    }

    /// Pump forever
    pub async fn run<R, N, D, M>(
        mut self,
        reader: &mut R,
        notifier: &mut N,
        delay: &mut D,
        session: &SharedSession<M>,
        handle: u16,
    ) -> !
    where
        R: Read,
        N: GattNotifier,
        D: DelayNs,
        M: RawMutex,
    {
        loop {
            // Errors are logged where they happen
            let _ = self.pump_once(reader, notifier, delay, session, handle).await;
        }
    }
}

impl Default for SerialBridge {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(kind: ErrorKind) -> SerialError {
    match kind {
        ErrorKind::TimedOut => SerialError::Timeout,
        ErrorKind::OutOfMemory => SerialError::OverflowError,
        _ => SerialError::FramingError,
    }
}
