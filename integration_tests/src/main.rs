//! Integration tests for the BLE SPP bridge firmware.
//!
//! Run after flashing the firmware, with the device's UART0 wired to a USB
//! serial adapter and a Bluetooth adapter on the host.

mod ble_client;
mod device;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use ble_client::BleClient;
use device::{resolve_port, DeviceClient};
use tests::{print_results, run_all_tests, Rig};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the BLE SPP bridge firmware")]
struct Args {
    /// Serial port wired to the device's UART (use "auto" to auto-detect)
    #[arg(short, long, default_value = "auto")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// BLE device name
    #[arg(long, default_value = "ESP_SPP_SERVER")]
    ble_name: String,

    /// BLE scan timeout in seconds
    #[arg(long, default_value = "10")]
    scan_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let port = resolve_port(&args.port)?;

    println!("{}", "BLE SPP Bridge Integration Tests".bold());
    println!("Port: {}", port);
    println!("Baud: {}", args.baud);
    println!("BLE:  {}", args.ble_name);
    println!();

    println!("Opening serial port...");
    let mut serial = DeviceClient::new(&port, args.baud)?;
    std::thread::sleep(Duration::from_millis(500));
    serial.drain_buffer()?;
    println!("{}", "  Serial ready!".green());

    println!("Scanning for \"{}\"...", args.ble_name);
    let ble = BleClient::connect_by_name(&args.ble_name, Duration::from_secs(args.scan_timeout)).await?;
    println!("{}", "  BLE connected!".green());

    // Let the subscription settle before sending data
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("\nRunning tests...\n");

    let mut rig = Rig { ble, serial };
    let results = run_all_tests(&mut rig).await;
    print_results(&results);

    let _ = rig.ble.disconnect().await;

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
