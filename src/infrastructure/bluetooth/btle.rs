//! btleplug-backed implementation of the GATT stack.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, Service,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::{Stream, StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::infrastructure::bluetooth::stack::{BleStack, StackError};

fn backend(e: btleplug::Error) -> StackError {
    StackError::Backend(e.to_string())
}

pub struct BtleStack {
    adapter: Adapter,
}

impl BtleStack {
    /// Binds to the first Bluetooth adapter on the host.
    pub async fn new() -> anyhow::Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no Bluetooth adapter available"))?;
        info!("Bluetooth adapter initialized");
        Ok(Self { adapter })
    }

    /// Stream of ids of peripherals the OS stack reports as disconnected.
    pub async fn disconnect_events(
        &self,
    ) -> anyhow::Result<Pin<Box<dyn Stream<Item = String> + Send>>> {
        let events = self.adapter.events().await?;
        Ok(Box::pin(events.filter_map(|event| async move {
            match event {
                CentralEvent::DeviceDisconnected(id) => Some(id.to_string()),
                _ => None,
            }
        })))
    }

    async fn scan_for(&self, name_prefix: &str) -> Result<Peripheral, StackError> {
        let mut events = self.adapter.events().await.map_err(backend)?;

        // Anything still cached from an earlier scan counts too.
        for peripheral in self.adapter.peripherals().await.map_err(backend)? {
            if self.matches(&peripheral, name_prefix).await {
                return Ok(peripheral);
            }
        }

        while let Some(event) = events.next().await {
            match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                    if let Ok(peripheral) = self.adapter.peripheral(&id).await {
                        if self.matches(&peripheral, name_prefix).await {
                            return Ok(peripheral);
                        }
                    }
                }
                _ => {}
            }
        }
        Err(StackError::NotFound)
    }

    async fn matches(&self, peripheral: &Peripheral, name_prefix: &str) -> bool {
        match peripheral.properties().await {
            Ok(Some(properties)) => properties
                .local_name
                .as_deref()
                .is_some_and(|name| name.starts_with(name_prefix)),
            _ => false,
        }
    }
}

#[async_trait]
impl BleStack for BtleStack {
    type Device = Peripheral;
    type Server = Peripheral;
    type Service = Service;
    type Characteristic = BtleCharacteristic;

    fn device_id(&self, device: &Peripheral) -> String {
        device.id().to_string()
    }

    async fn discover(
        &self,
        name_prefix: &str,
        deadline: Duration,
    ) -> Result<Peripheral, StackError> {
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(backend)?;

        let result = timeout(deadline, self.scan_for(name_prefix)).await;
        if let Err(e) = self.adapter.stop_scan().await {
            warn!("failed to stop scan: {e}");
        }

        match result {
            Ok(found) => {
                if let Ok(peripheral) = &found {
                    debug!(id = %peripheral.id(), "matching peripheral found");
                }
                found
            }
            Err(_) => Err(StackError::Timeout),
        }
    }

    async fn connect(
        &self,
        device: &Peripheral,
        deadline: Duration,
    ) -> Result<Peripheral, StackError> {
        match timeout(deadline, device.connect()).await {
            Ok(Ok(())) => Ok(device.clone()),
            Ok(Err(e)) => Err(backend(e)),
            Err(_) => Err(StackError::Timeout),
        }
    }

    async fn resolve_service(
        &self,
        server: &Peripheral,
        service: Uuid,
        deadline: Duration,
    ) -> Result<Service, StackError> {
        match timeout(deadline, server.discover_services()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(backend(e)),
            Err(_) => return Err(StackError::Timeout),
        }
        server
            .services()
            .into_iter()
            .find(|s| s.uuid == service)
            .ok_or(StackError::NotFound)
    }

    async fn resolve_characteristic(
        &self,
        server: &Peripheral,
        service: &Service,
        characteristic: Uuid,
    ) -> Result<BtleCharacteristic, StackError> {
        let inner = service
            .characteristics
            .iter()
            .find(|c| c.uuid == characteristic)
            .cloned()
            .ok_or(StackError::NotFound)?;
        Ok(BtleCharacteristic {
            peripheral: server.clone(),
            characteristic: inner,
        })
    }

    async fn write_without_response(
        &self,
        characteristic: &BtleCharacteristic,
        payload: &[u8],
    ) -> Result<(), StackError> {
        characteristic
            .peripheral
            .write(
                &characteristic.characteristic,
                payload,
                WriteType::WithoutResponse,
            )
            .await
            .map_err(backend)
    }

    async fn teardown(&self, server: &Peripheral) {
        if let Err(e) = server.disconnect().await {
            warn!("disconnect failed: {e}");
        }
    }
}

/// btleplug addresses writes through the peripheral, so the published
/// characteristic handle carries both.
#[derive(Clone)]
pub struct BtleCharacteristic {
    peripheral: Peripheral,
    characteristic: Characteristic,
}
