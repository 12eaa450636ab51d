//! Command consumer task

use embassy_time::Delay;

use crate::commands::CommandConsumer;
use crate::dispatcher::COMMAND_QUEUE;

/// Task that drains commands written by the peer
pub async fn command_task() -> ! {
    let mut delay = Delay;
    CommandConsumer::new(&COMMAND_QUEUE).run(&mut delay).await
}
