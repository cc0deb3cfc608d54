//! bthost - a Bluetooth stack adapter over the host platform's own radio.
//!
//! The host platform already owns a Bluetooth controller; this crate fronts
//! it behind the portable [`BluetoothStack`] contract instead of driving the
//! hardware itself. Local-radio control, discoverability and the bonded
//! registry delegate to the platform; socket-level operations report
//! [`StackError::NotSupported`], and [`CapabilitySet`] tells callers which
//! operation groups are carried before they try.

pub mod address;
pub mod config;
pub mod ffi;
pub mod host;
pub mod platform;
pub mod stack;

pub use address::{AddressError, DeviceAddress};
pub use config::{StackConfig, DEFAULT_DISCOVERABLE_DURATION};
pub use host::HostStack;
pub use platform::{PlatformContext, PlatformError, PlatformRadio};
pub use stack::{
    BluetoothStack, CapabilitySet, DeviceClass, DiscoverableMode, InquiryAccess,
    RemoteDeviceRecord, StackError,
};
