//! Data path between the BLE link and the UART
//!
//! Outbound serial data is split into notifications by the fragmenter;
//! inbound long writes are staged by the reassembly buffer.

pub mod fragmenter;
pub mod reassembly;

pub use fragmenter::Fragmenter;
pub use reassembly::{ReassemblyBuffer, ReassemblyError};
