//! Command queue and its consumer
//!
//! Control writes are best-effort: the producer waits a short time for
//! space and drops the command if the queue stays full.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embedded_hal_async::delay::DelayNs;

use crate::commands::types::CommandBuffer;
use crate::config::timing::{COMMAND_ENQUEUE_WAIT_MS, COMMAND_POLL_MS};
use crate::error::BridgeError;

/// Bounded FIFO of command buffers
///
/// Multiple producers are allowed, a single consumer drains it.
pub struct CommandQueue<M: RawMutex, const N: usize> {
    channel: Channel<M, CommandBuffer, N>,
}

impl<M: RawMutex, const N: usize> CommandQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Hand a command over to the consumer
    ///
    /// Waits up to the enqueue timeout for space. On timeout the buffer is
    /// dropped and [`BridgeError::QueueFull`] returned.
    pub async fn enqueue<D: DelayNs>(&self, buffer: CommandBuffer, delay: &mut D) -> Result<(), BridgeError> {
        match select(self.channel.send(buffer), delay.delay_ms(COMMAND_ENQUEUE_WAIT_MS)).await {
            Either::First(()) => Ok(()),
            Either::Second(()) => {
                log::warn!("Command: queue full, command dropped");
                Err(BridgeError::QueueFull)
            }
        }
    }

    /// Wait for the next command
    pub async fn dequeue(&self) -> CommandBuffer {
        self.channel.receive().await
    }

    /// Take the next command if one is queued
    pub fn try_dequeue(&self) -> Option<CommandBuffer> {
        self.channel.try_receive().ok()
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<M: RawMutex, const N: usize> Default for CommandQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Single consumer of the command queue
///
/// Commands are not interpreted; each one is logged and released.
pub struct CommandConsumer<'q, M: RawMutex, const N: usize> {
    queue: &'q CommandQueue<M, N>,
    processed: u32,
}

impl<'q, M: RawMutex, const N: usize> CommandConsumer<'q, M, N> {
    pub fn new(queue: &'q CommandQueue<M, N>) -> Self {
        Self { queue, processed: 0 }
    }

    /// Idle for the poll interval, then wait for and handle one command
    ///
    /// Returns the handled command's payload length.
    pub async fn step<D: DelayNs>(&mut self, delay: &mut D) -> usize {
        delay.delay_ms(COMMAND_POLL_MS).await;
        let command = self.queue.dequeue().await;
        self.handle(&command);
        command.len()
    }

    /// Handle commands forever
    pub async fn run<D: DelayNs>(mut self, delay: &mut D) -> ! {
        loop {
            self.step(delay).await;
        }
    }

    /// Number of commands handled so far
    pub fn processed(&self) -> u32 {
        self.processed
    }

    fn handle(&mut self, command: &CommandBuffer) {
        self.processed = self.processed.wrapping_add(1);

        // Show as string if valid UTF-8, else hex
        match core::str::from_utf8(command.text()) {
            Ok(s) => log::info!("Command: '{}'", s),
            Err(_) => log::info!("Command: {:02x?}", command.as_bytes()),
        }
    }
}
