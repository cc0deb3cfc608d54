//! Platform collaborators the stack adapter delegates to.
//!
//! The host platform owns the singleton Bluetooth controller. This module
//! defines the narrow surface the stack consumes from it, so a backend can
//! plug in per platform and tests can inject an in-memory radio.

use std::sync::Arc;
use thiserror::Error;

use crate::address::DeviceAddress;
use crate::stack::RemoteDeviceRecord;

#[cfg(all(target_os = "linux", feature = "bluez"))]
pub mod bluez;
pub mod mem;

/// Raw scan-mode values a platform radio reports.
///
/// Host-driven bridges pass their platform's own constants through unchanged;
/// the values here mirror the Android scan-mode constants.
pub mod scan_mode {
    /// Not connectable and not discoverable.
    pub const NONE: i32 = 20;
    /// Connectable but not answering inquiry scans.
    pub const CONNECTABLE: i32 = 21;
    /// Connectable and general-discoverable.
    pub const CONNECTABLE_DISCOVERABLE: i32 = 23;
}

/// Failures reported by a platform backend.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The host has no usable Bluetooth radio.
    #[error("Bluetooth isn't supported on this device")]
    NoRadio,
    /// A call into the platform Bluetooth service failed.
    #[error("platform call failed: {0}")]
    Call(String),
}

/// The platform's Bluetooth radio controller.
///
/// One instance fronts the host's singleton adapter. The stack holds it for
/// its whole lifetime and never owns the underlying radio.
pub trait PlatformRadio: Send + Sync {
    /// Short backend identifier, such as `"bluez"` or `"mem"`.
    fn backend(&self) -> &'static str;

    /// Whether the radio is currently powered.
    fn is_enabled(&self) -> Result<bool, PlatformError>;

    /// Request power-on. Returns true if the request is accepted; a rejected
    /// request leaves the radio off and is not an error.
    fn enable(&self) -> Result<bool, PlatformError>;

    /// Request power-off. Returns true if the request is accepted.
    fn disable(&self) -> Result<bool, PlatformError>;

    /// Hardware address of the radio.
    fn address(&self) -> Result<DeviceAddress, PlatformError>;

    /// Friendly name of the radio.
    fn name(&self) -> Result<String, PlatformError>;

    /// Current raw scan mode, one of the [`scan_mode`] values.
    fn scan_mode(&self) -> Result<i32, PlatformError>;

    /// Devices the platform has bonded with.
    fn bonded_devices(&self) -> Result<Vec<RemoteDeviceRecord>, PlatformError>;

    /// Cached display name of a remote device.
    fn remote_device_name(
        &self,
        address: DeviceAddress,
    ) -> Result<Option<String>, PlatformError>;
}

/// Execution-context handle through which user-facing platform requests are
/// raised; an activity or window handle on mobile platforms.
pub trait PlatformContext: Send + Sync {
    /// Ask the platform to move the radio to `mode` (a [`scan_mode`] value)
    /// for `duration_secs`. Issuing the request does not confirm the change.
    fn request_discoverable(&self, mode: i32, duration_secs: u32) -> Result<(), PlatformError>;
}

/// Acquire the host platform's default radio and execution context.
///
/// Returns [`PlatformError::NoRadio`] on hosts without a compiled-in backend.
pub fn default_platform(
    adapter_name: Option<&str>,
) -> Result<(Arc<dyn PlatformRadio>, Arc<dyn PlatformContext>), PlatformError> {
    #[cfg(all(target_os = "linux", feature = "bluez"))]
    {
        let radio = Arc::new(bluez::BluezRadio::new(adapter_name)?);
        let context: Arc<dyn PlatformContext> = radio.clone();
        let radio: Arc<dyn PlatformRadio> = radio;
        Ok((radio, context))
    }

    #[cfg(not(all(target_os = "linux", feature = "bluez")))]
    {
        let _ = adapter_name;
        Err(PlatformError::NoRadio)
    }
}
