//! FFI data types and JSON schemas (v1).
//!
//! All data crossing the FFI boundary is JSON. Each message carries a
//! `version` field for future compatibility.

use serde::{Deserialize, Serialize};

use crate::address::DeviceAddress;
use crate::stack::{RemoteDeviceRecord, StackError};

/// Version 1 of the FFI protocol.
pub const FFI_VERSION: u32 = 1;

/// Result envelope returned by every FFI call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FfiResult<T> {
    Ok { ok: bool, data: T },
    Err { ok: bool, code: String, message: String },
}

impl<T> FfiResult<T> {
    pub fn success(data: T) -> Self {
        FfiResult::Ok { ok: true, data }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        FfiResult::Err {
            ok: false,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Envelope for a stack failure, with a stable machine-readable code.
    pub fn from_stack_error(err: &StackError) -> Self {
        let code = match err {
            StackError::Unavailable(_) => "ERR_UNAVAILABLE",
            StackError::ContextRequired => "ERR_CONTEXT_REQUIRED",
            StackError::Platform(_) => "ERR_PLATFORM",
            StackError::NotSupported(_) => "ERR_UNSUPPORTED",
        };
        FfiResult::error(code, err.to_string())
    }
}

/// Seed state for the host-driven radio bridge.
///
/// The host owns the real radio; this snapshot primes the bridge at init.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub version: u32,
    /// Radio hardware address, in either hexadecimal form.
    pub address: DeviceAddress,
    /// Radio friendly name.
    pub name: String,
    /// Whether the radio is currently powered.
    pub enabled: bool,
    /// Current raw scan mode, in the platform's own constants.
    pub scan_mode: i32,
    /// Previously bonded devices.
    #[serde(default)]
    pub bonded: Vec<RemoteDeviceRecord>,
    /// Visibility window in seconds; `None` keeps the default.
    #[serde(default)]
    pub discoverable_duration: Option<u32>,
    /// Initialize logging on the host's log sink.
    #[serde(default)]
    pub enable_logging: bool,
    /// Log level when logging is enabled (`"trace"` through `"error"`).
    #[serde(default)]
    pub log_level: Option<String>,
}

/// A pending discoverability request the host should raise as a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRequest {
    pub version: u32,
    pub scan_mode: i32,
    pub duration_secs: u32,
}

/// Local-radio summary returned by the info call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioInfo {
    pub version: u32,
    pub stack_id: String,
    pub address: DeviceAddress,
    pub address_hex: String,
    pub name: String,
    pub powered: bool,
    /// Raw capability bits, see the stack capability constants.
    pub capabilities: u32,
}
