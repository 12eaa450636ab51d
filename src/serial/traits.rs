//! Serial peripheral error type and test double
//!
//! The bridge reads and writes the UART through the `embedded_io_async`
//! traits, so the real esp-hal UART halves can be swapped with a mock for
//! testing.

/// Errors that can occur during serial operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// Framing error in received data
    FramingError,
    /// Buffer overflow
    OverflowError,
    /// Operation timed out
    Timeout,
    /// Write error
    WriteError,
}

impl embedded_io::Error for SerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            SerialError::FramingError => embedded_io::ErrorKind::InvalidData,
            SerialError::OverflowError => embedded_io::ErrorKind::OutOfMemory,
            SerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            SerialError::WriteError => embedded_io::ErrorKind::Other,
        }
    }
}
