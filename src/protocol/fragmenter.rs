//! Outbound notification fragmenter
//!
//! Splits serial data into pieces that fit one notification at the
//! negotiated MTU and sends them in order, pausing after each piece of a
//! fragmented payload so the controller's transmit queue keeps up.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::ble::traits::{GattNotifier, TransportError};
use crate::config::timing::CHUNK_PACING_MS;
use crate::session::{Session, SharedSession};

/// Splits payloads into MTU-sized notifications
pub struct Fragmenter {
    pacing_ms: u32,
}

impl Fragmenter {
    /// Create a fragmenter with the default pacing
    pub const fn new() -> Self {
        Self {
            pacing_ms: CHUNK_PACING_MS,
        }
    }

    /// Number of notifications needed for `len` bytes at `unit` bytes each
    pub fn chunk_count(len: usize, unit: usize) -> usize {
        len.div_ceil(unit)
    }

    /// Notify `payload` on `handle` over the published session's link
    ///
    /// Every piece is `mtu - 3` bytes except the last, which carries the
    /// remainder; an exact multiple ends on a full piece. The session is
    /// checked again before each piece: if the link dropped, changed, or
    /// notifications were turned off, the rest of the payload is abandoned
    /// with [`TransportError::NotConnected`]. A failed notification also
    /// abandons the rest. Returns the number of notifications sent.
    pub async fn send<N, D, M>(
        &self,
        notifier: &mut N,
        delay: &mut D,
        session: &SharedSession<M>,
        handle: u16,
        payload: &[u8],
    ) -> Result<usize, TransportError>
    where
        N: GattNotifier,
        D: DelayNs,
        M: RawMutex,
    {
        if payload.is_empty() {
            return Ok(0);
        }

        let start = session.snapshot();
        if !start.can_notify() {
            return Err(TransportError::NotConnected);
        }
        let unit = start.chunk_size();
        let link_id = start.link_id();

        if payload.len() <= unit {
            notifier.notify(link_id, handle, payload).await?;
            return Ok(1);
        }

        let total = Self::chunk_count(payload.len(), unit);
        log::debug!("Fragmenter: {} bytes in {} notifications of {}", payload.len(), total, unit);

        for (i, chunk) in payload.chunks(unit).enumerate() {
            if !Self::same_link(&session.snapshot(), link_id) {
                log::info!("Fragmenter: link gone after {}/{} notifications, dropping rest", i, total);
                return Err(TransportError::NotConnected);
            }
            if let Err(e) = notifier.notify(link_id, handle, chunk).await {
                log::warn!("Fragmenter: notification {}/{} failed ({:?}), dropping rest", i + 1, total, e);
                return Err(e);
            }
            delay.delay_ms(self.pacing_ms).await;
        }

        Ok(total)
    }

    fn same_link(session: &Session, link_id: u16) -> bool {
        session.can_notify() && session.link_id() == link_id
    }
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub mod mock {
    //! Delay that returns immediately and records what was requested

    use embedded_hal_async::delay::DelayNs;
    use std::vec::Vec;

    #[derive(Default)]
    pub struct RecordingDelay {
        pub delays_ms: Vec<u32>,
    }

    impl RecordingDelay {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl DelayNs for RecordingDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.delays_ms.push(ns / 1_000_000);
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.delays_ms.push(ms);
        }
    }
}
