//! Configuration constants for the ESP32-S3 BLE SPP bridge

/// GATT layout and link parameters
pub mod gatt {
    /// ATT MTU before any exchange has happened
    pub const DEFAULT_MTU: u16 = 23;

    /// Opcode + handle bytes carried by every notification
    pub const ATT_OVERHEAD: u16 = 3;

    /// Maximum application payload of the data characteristics
    pub const DATA_MAX_LEN: usize = 512;

    /// Maximum length of the command characteristic
    pub const COMMAND_MAX_LEN: usize = 20;

    /// Maximum length of the status characteristic
    pub const STATUS_MAX_LEN: usize = 20;

    /// Number of attribute slots in the SPP service
    pub const SLOT_COUNT: usize = 11;

    /// Client characteristic configuration values
    pub const CCCD_ENABLE: [u8; 2] = [0x01, 0x00];
    pub const CCCD_DISABLE: [u8; 2] = [0x00, 0x00];

    /// 16-bit service UUID, characteristics follow at 0xABF1..=0xABF4
    pub const SERVICE_UUID: u16 = 0xABF0;
}

/// Task timing
pub mod timing {
    /// Pause after each notification of a fragmented payload
    pub const CHUNK_PACING_MS: u32 = 20;

    /// How long a control write may wait for queue space
    pub const COMMAND_ENQUEUE_WAIT_MS: u32 = 10;

    /// Idle interval of the command consumer between receives
    pub const COMMAND_POLL_MS: u32 = 50;

    /// Back-off after a UART read error
    pub const SERIAL_ERROR_BACKOFF_MS: u32 = 10;
}

/// Channel depths
pub mod queue {
    pub const COMMAND_QUEUE_DEPTH: usize = 10;
    pub const NOTIFY_QUEUE_DEPTH: usize = 4;
}

/// Serial (UART0 on GPIO43/GPIO44) configuration
pub mod serial {
    pub const BAUD_RATE: u32 = 115200;

    /// Largest block read from the UART in one go
    pub const READ_CHUNK: usize = super::gatt::DATA_MAX_LEN;
}

/// Advertising configuration
pub mod advertising {
    pub const DEVICE_NAME: &str = "ESP_SPP_SERVER";

    /// Raw advertisement payload
    ///
    /// Flags (LE General Discoverable, BR/EDR not supported), the complete
    /// list of 16-bit service UUIDs and the complete local name.
    pub const PAYLOAD: [u8; 23] = [
        0x02, 0x01, 0x06,
        0x03, 0x03, 0xF0, 0xAB,
        0x0F, 0x09,
        b'E', b'S', b'P', b'_', b'S', b'P', b'P', b'_', b'S', b'E', b'R', b'V', b'E', b'R',
    ];

    /// Advertising packet limit
    pub const MAX_PAYLOAD_LEN: usize = 31;
}
