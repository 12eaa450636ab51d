pub mod reader;
pub mod traits;

pub use reader::{PumpOutcome, SerialBridge};
pub use traits::SerialError;
