//! BLE client for the bridge's SPP service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use btleplug::api::bleuuid::uuid_from_u16;
use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

/// SPP service and characteristic UUIDs (16-bit, Bluetooth base UUID)
fn data_recv_uuid() -> Uuid {
    uuid_from_u16(0xABF1) // Write to device
}
fn data_notify_uuid() -> Uuid {
    uuid_from_u16(0xABF2) // Notify from device
}
fn command_uuid() -> Uuid {
    uuid_from_u16(0xABF3)
}
fn status_uuid() -> Uuid {
    uuid_from_u16(0xABF4)
}

/// BLE client for the bridge.
pub struct BleClient {
    peripheral: Peripheral,
    data_recv: Characteristic,
    data_notify: Characteristic,
    command: Characteristic,
    status: Characteristic,
    /// Notifications received on the data characteristic, one entry each
    notifications: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BleClient {
    /// Scan for a device by name, connect and subscribe to data.
    pub async fn connect_by_name(name: &str, scan_timeout: Duration) -> Result<Self> {
        let manager = Manager::new().await?;
        let adapters = manager.adapters().await?;
        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No Bluetooth adapters found"))?;

        adapter.start_scan(ScanFilter::default()).await?;
        let peripheral = Self::find_device_by_name(&adapter, name, scan_timeout).await?;
        adapter.stop_scan().await?;

        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();
        let find = |uuid: Uuid, label: &str| {
            characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or_else(|| anyhow!("{} characteristic not found", label))
        };

        let data_recv = find(data_recv_uuid(), "Data receive")?;
        let data_notify = find(data_notify_uuid(), "Data notify")?;
        let command = find(command_uuid(), "Command")?;
        let status = find(status_uuid(), "Status")?;

        let notifications = Arc::new(Mutex::new(Vec::new()));

        let buffer_clone = notifications.clone();
        let peripheral_clone = peripheral.clone();
        tokio::spawn(async move {
            let mut stream = match peripheral_clone.notifications().await {
                Ok(s) => s,
                Err(_) => return,
            };

            while let Some(data) = stream.next().await {
                if data.uuid == data_notify_uuid() {
                    buffer_clone.lock().await.push(data.value);
                }
            }
        });

        let client = Self {
            peripheral,
            data_recv,
            data_notify,
            command,
            status,
            notifications,
        };
        client.subscribe_data().await?;
        Ok(client)
    }

    async fn find_device_by_name(
        adapter: &Adapter,
        name: &str,
        scan_timeout: Duration,
    ) -> Result<Peripheral> {
        let start = std::time::Instant::now();

        while start.elapsed() < scan_timeout {
            for peripheral in adapter.peripherals().await? {
                if let Some(props) = peripheral.properties().await? {
                    if props.local_name.as_deref() == Some(name) {
                        return Ok(peripheral);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Err(anyhow!("Device '{}' not found within timeout", name))
    }

    /// Enable data notifications.
    pub async fn subscribe_data(&self) -> Result<()> {
        self.peripheral.subscribe(&self.data_notify).await?;
        Ok(())
    }

    /// Disable data notifications.
    pub async fn unsubscribe_data(&self) -> Result<()> {
        self.peripheral.unsubscribe(&self.data_notify).await?;
        Ok(())
    }

    /// Write bytes for the bridge to put on the UART.
    ///
    /// With a response, payloads longer than one PDU go out as a long
    /// (prepared) write.
    pub async fn write_data(&self, data: &[u8], with_response: bool) -> Result<()> {
        let write_type = if with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };
        self.peripheral.write(&self.data_recv, data, write_type).await?;
        Ok(())
    }

    /// Write a control message.
    pub async fn write_command(&self, data: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.command, data, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    /// Read the status characteristic.
    pub async fn read_status(&self) -> Result<Vec<u8>> {
        Ok(self.peripheral.read(&self.status).await?)
    }

    /// Wait until `len` bytes of notifications arrived; returns each notification.
    pub async fn wait_for_data(&self, len: usize, wait: Duration) -> Result<Vec<Vec<u8>>> {
        let result = timeout(wait, async {
            loop {
                {
                    let buf = self.notifications.lock().await;
                    if buf.iter().map(Vec::len).sum::<usize>() >= len {
                        return buf.clone();
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        match result {
            Ok(chunks) => Ok(chunks),
            Err(_) => {
                let got: usize = self.notifications.lock().await.iter().map(Vec::len).sum();
                Err(anyhow!("Timeout waiting for {} notified bytes, got {}", len, got))
            }
        }
    }

    /// Number of notifications received so far.
    pub async fn notification_count(&self) -> usize {
        self.notifications.lock().await.len()
    }

    /// Forget received notifications.
    pub async fn clear_buffer(&self) {
        self.notifications.lock().await.clear();
    }

    /// Disconnect from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.unsubscribe(&self.data_notify).await?;
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
