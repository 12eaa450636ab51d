#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart, UartRx, UartTx};
use esp_hal::Async;
use static_cell::StaticCell;

use ble_spp_bridge_firmware::config;
use ble_spp_bridge_firmware::tasks::{ble_task, command_task, serial_reader_task};

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

#[esp_hal::main]
fn main() -> ! {
    // Logs go to USB Serial JTAG; UART0 carries bridge data only
    esp_println::logger::init_logger(log::LevelFilter::Info);

    // Initialise heap allocator for BLE and long-write reassembly
    esp_alloc::heap_allocator!(size: 64 * 1024);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // UART0 on the default console pins, 8N1
    let uart = Uart::new(
        peripherals.UART0,
        UartConfig::default().with_baudrate(config::serial::BAUD_RATE),
    )
    .unwrap()
    .with_tx(peripherals.GPIO43)
    .with_rx(peripherals.GPIO44)
    .into_async();
    let (uart_rx, uart_tx) = uart.split();

    // Static random address derived from the eFuse MAC
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let address = [mac[3], mac[4], mac[5], 0x1E, 0x83, 0xE7];

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller = RADIO_CONTROLLER.init(
        esp_radio::init().expect("Failed to initialize esp-radio")
    );

    // Create BLE connector (ownership is passed to ExternalController)
    let ble_connector = esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    ).expect("Failed to initialize BLE connector");

    // Wrap in ExternalController for trouble-host compatibility
    let controller: BleController = trouble_host::prelude::ExternalController::new(ble_connector);

    log::info!("Bridge: starting");

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, uart_rx, uart_tx, controller, address));
    })
}

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    uart_rx: UartRx<'static, Async>,
    uart_tx: UartTx<'static, Async>,
    ble_controller: BleController,
    address: [u8; 6],
) {
    spawner.spawn(ble_host_task(ble_controller, uart_tx, address)).unwrap();
    spawner.spawn(serial_task(uart_rx)).unwrap();
    spawner.spawn(command_consumer_task()).unwrap();
}

/// Task that runs the BLE stack and the event dispatcher
///
/// Owns the UART transmit half: data written by the peer goes straight out.
#[embassy_executor::task]
async fn ble_host_task(controller: BleController, uart_tx: UartTx<'static, Async>, address: [u8; 6]) {
    ble_task(controller, uart_tx, address).await;
    log::error!("BLE: task stopped");
}

/// Task that forwards UART input to the BLE peer
#[embassy_executor::task]
async fn serial_task(uart_rx: UartRx<'static, Async>) {
    serial_reader_task(uart_rx).await
}

/// Task that drains the command queue
#[embassy_executor::task]
async fn command_consumer_task() {
    command_task().await
}
