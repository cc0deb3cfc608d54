//! BlueZ platform backend.
//!
//! Fronts the session's default adapter through D-Bus via `bluer`. The stack
//! contract is synchronous, so this backend owns a private current-thread
//! runtime and blocks on each property call.

use bluer::{Adapter, Session};
use tokio::runtime::Runtime;

use super::{scan_mode, PlatformContext, PlatformError, PlatformRadio};
use crate::address::DeviceAddress;
use crate::stack::RemoteDeviceRecord;

impl From<bluer::Error> for PlatformError {
    fn from(err: bluer::Error) -> Self {
        PlatformError::Call(err.to_string())
    }
}

/// BlueZ-backed platform radio.
pub struct BluezRadio {
    _session: Session,
    adapter: Adapter,
    rt: Runtime,
}

impl BluezRadio {
    /// Bind the named adapter (`"hci0"`), or the session default.
    pub fn new(adapter_name: Option<&str>) -> Result<Self, PlatformError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PlatformError::Call(format!("failed to start runtime: {}", e)))?;

        let (session, adapter) = rt.block_on(async {
            let session = Session::new()
                .await
                .map_err(|e| PlatformError::Call(format!("failed to connect to BlueZ: {}", e)))?;
            let adapter = match adapter_name {
                Some(name) => session.adapter(name).map_err(|_| PlatformError::NoRadio)?,
                None => session
                    .default_adapter()
                    .await
                    .map_err(|_| PlatformError::NoRadio)?,
            };
            Ok::<_, PlatformError>((session, adapter))
        })?;

        tracing::info!(adapter = adapter.name(), "bound BlueZ adapter");
        Ok(BluezRadio {
            _session: session,
            adapter,
            rt,
        })
    }
}

impl PlatformRadio for BluezRadio {
    fn backend(&self) -> &'static str {
        "bluez"
    }

    fn is_enabled(&self) -> Result<bool, PlatformError> {
        Ok(self.rt.block_on(self.adapter.is_powered())?)
    }

    fn enable(&self) -> Result<bool, PlatformError> {
        self.rt.block_on(self.adapter.set_powered(true))?;
        Ok(true)
    }

    fn disable(&self) -> Result<bool, PlatformError> {
        self.rt.block_on(self.adapter.set_powered(false))?;
        Ok(true)
    }

    fn address(&self) -> Result<DeviceAddress, PlatformError> {
        let addr = self.rt.block_on(self.adapter.address())?;
        Ok(DeviceAddress::from_bytes(addr.0))
    }

    fn name(&self) -> Result<String, PlatformError> {
        Ok(self.rt.block_on(self.adapter.alias())?)
    }

    /// BlueZ has no scan-mode notion; one is synthesized from the powered
    /// and discoverable properties.
    fn scan_mode(&self) -> Result<i32, PlatformError> {
        self.rt.block_on(async {
            if !self.adapter.is_powered().await? {
                return Ok(scan_mode::NONE);
            }
            if self.adapter.is_discoverable().await? {
                Ok(scan_mode::CONNECTABLE_DISCOVERABLE)
            } else {
                Ok(scan_mode::CONNECTABLE)
            }
        })
    }

    fn bonded_devices(&self) -> Result<Vec<RemoteDeviceRecord>, PlatformError> {
        self.rt.block_on(async {
            let mut records = Vec::new();
            for addr in self.adapter.device_addresses().await? {
                let device = self.adapter.device(addr)?;
                if !device.is_paired().await.unwrap_or(false) {
                    continue;
                }
                records.push(RemoteDeviceRecord {
                    address: DeviceAddress::from_bytes(addr.0),
                    name: device.alias().await.ok(),
                    bonded: true,
                });
            }
            Ok(records)
        })
    }

    fn remote_device_name(
        &self,
        address: DeviceAddress,
    ) -> Result<Option<String>, PlatformError> {
        self.rt.block_on(async {
            let device = self.adapter.device(bluer::Address::new(address.to_bytes()))?;
            Ok(device.name().await?)
        })
    }
}

impl PlatformContext for BluezRadio {
    /// BlueZ applies discoverability directly; no user prompt is involved.
    fn request_discoverable(&self, mode: i32, duration_secs: u32) -> Result<(), PlatformError> {
        self.rt.block_on(async {
            if mode == scan_mode::CONNECTABLE_DISCOVERABLE {
                self.adapter.set_discoverable_timeout(duration_secs).await?;
                self.adapter.set_discoverable(true).await?;
            } else {
                self.adapter.set_discoverable(false).await?;
            }
            Ok(())
        })
    }
}
