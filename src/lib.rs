#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod ble;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod serial;
pub mod session;

// Device glue depends on esp-hal, embassy-time and trouble-host
#[cfg(feature = "embedded")]
pub mod tasks;
