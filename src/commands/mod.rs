pub mod queue;
pub mod types;

pub use queue::{CommandConsumer, CommandQueue};
pub use types::CommandBuffer;
