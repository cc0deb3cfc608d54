//! In-memory platform backend.
//!
//! Stands in for a real radio in two situations: tests that need a
//! deterministic platform, and host-driven embeddings where the application
//! owning the real radio seeds its state into this bridge and drains the
//! recorded discoverability requests to raise the real system prompt.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{scan_mode, PlatformContext, PlatformError, PlatformRadio};
use crate::address::DeviceAddress;
use crate::stack::RemoteDeviceRecord;

/// A discoverability request recorded by [`MemRadio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverableRequest {
    /// Requested raw scan mode.
    pub mode: i32,
    /// Requested visibility duration in seconds.
    pub duration_secs: u32,
}

#[derive(Debug)]
struct MemState {
    enabled: bool,
    accept_power_requests: bool,
    absent: bool,
    address: DeviceAddress,
    name: String,
    scan_mode: i32,
    bonded: Vec<RemoteDeviceRecord>,
    remote_names: HashMap<DeviceAddress, String>,
    honor_requests: bool,
    requests: Vec<DiscoverableRequest>,
    enable_calls: u32,
    disable_calls: u32,
}

/// Cloneable in-memory radio; every clone shares the same state.
///
/// Implements both platform traits, so one instance can serve as radio and
/// execution context at once.
#[derive(Clone)]
pub struct MemRadio {
    state: Arc<Mutex<MemState>>,
}

impl MemRadio {
    /// A radio that is powered, connectable and has a fixed address.
    pub fn new() -> Self {
        MemRadio {
            state: Arc::new(Mutex::new(MemState {
                enabled: true,
                accept_power_requests: true,
                absent: false,
                address: DeviceAddress::from_bytes([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]),
                name: "bthost-mem".to_string(),
                scan_mode: scan_mode::CONNECTABLE,
                bonded: Vec::new(),
                remote_names: HashMap::new(),
                honor_requests: true,
                requests: Vec::new(),
                enable_calls: 0,
                disable_calls: 0,
            })),
        }
    }

    /// The same radio, starting powered off.
    pub fn powered_off() -> Self {
        let radio = MemRadio::new();
        {
            let mut state = radio.state.lock();
            state.enabled = false;
            state.scan_mode = scan_mode::NONE;
        }
        radio
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    /// When false, `enable` and `disable` return `Ok(false)` and change
    /// nothing, like a platform whose user dismissed the power prompt.
    pub fn set_accept_power_requests(&self, accept: bool) {
        self.state.lock().accept_power_requests = accept;
    }

    /// When true, every radio call fails with [`PlatformError::NoRadio`].
    pub fn set_absent(&self, absent: bool) {
        self.state.lock().absent = absent;
    }

    pub fn set_address(&self, address: DeviceAddress) {
        self.state.lock().address = address;
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.state.lock().name = name.into();
    }

    pub fn set_scan_mode(&self, mode: i32) {
        self.state.lock().scan_mode = mode;
    }

    /// When false, discoverability requests are recorded but the scan mode
    /// stays put, like a prompt the user never answered.
    pub fn set_honor_requests(&self, honor: bool) {
        self.state.lock().honor_requests = honor;
    }

    pub fn add_bonded_device(&self, record: RemoteDeviceRecord) {
        self.state.lock().bonded.push(record);
    }

    pub fn set_remote_name(&self, address: DeviceAddress, name: impl Into<String>) {
        self.state.lock().remote_names.insert(address, name.into());
    }

    pub fn enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// All discoverability requests recorded so far, oldest first.
    pub fn requests(&self) -> Vec<DiscoverableRequest> {
        self.state.lock().requests.clone()
    }

    /// Remove and return the oldest pending discoverability request.
    ///
    /// Host bridges poll this to turn recorded requests into real prompts.
    pub fn take_request(&self) -> Option<DiscoverableRequest> {
        let mut state = self.state.lock();
        if state.requests.is_empty() {
            None
        } else {
            Some(state.requests.remove(0))
        }
    }

    pub fn enable_calls(&self) -> u32 {
        self.state.lock().enable_calls
    }

    pub fn disable_calls(&self) -> u32 {
        self.state.lock().disable_calls
    }

    fn check_present(state: &MemState) -> Result<(), PlatformError> {
        if state.absent {
            Err(PlatformError::NoRadio)
        } else {
            Ok(())
        }
    }
}

impl Default for MemRadio {
    fn default() -> Self {
        MemRadio::new()
    }
}

impl PlatformRadio for MemRadio {
    fn backend(&self) -> &'static str {
        "mem"
    }

    fn is_enabled(&self) -> Result<bool, PlatformError> {
        let state = self.state.lock();
        Self::check_present(&state)?;
        Ok(state.enabled)
    }

    fn enable(&self) -> Result<bool, PlatformError> {
        let mut state = self.state.lock();
        Self::check_present(&state)?;
        state.enable_calls += 1;
        if !state.accept_power_requests {
            return Ok(false);
        }
        state.enabled = true;
        if state.scan_mode == scan_mode::NONE {
            state.scan_mode = scan_mode::CONNECTABLE;
        }
        Ok(true)
    }

    fn disable(&self) -> Result<bool, PlatformError> {
        let mut state = self.state.lock();
        Self::check_present(&state)?;
        state.disable_calls += 1;
        if !state.accept_power_requests {
            return Ok(false);
        }
        state.enabled = false;
        state.scan_mode = scan_mode::NONE;
        Ok(true)
    }

    fn address(&self) -> Result<DeviceAddress, PlatformError> {
        let state = self.state.lock();
        Self::check_present(&state)?;
        Ok(state.address)
    }

    fn name(&self) -> Result<String, PlatformError> {
        let state = self.state.lock();
        Self::check_present(&state)?;
        Ok(state.name.clone())
    }

    fn scan_mode(&self) -> Result<i32, PlatformError> {
        let state = self.state.lock();
        Self::check_present(&state)?;
        Ok(state.scan_mode)
    }

    fn bonded_devices(&self) -> Result<Vec<RemoteDeviceRecord>, PlatformError> {
        let state = self.state.lock();
        Self::check_present(&state)?;
        Ok(state.bonded.clone())
    }

    fn remote_device_name(
        &self,
        address: DeviceAddress,
    ) -> Result<Option<String>, PlatformError> {
        let state = self.state.lock();
        Self::check_present(&state)?;
        Ok(state.remote_names.get(&address).cloned())
    }
}

impl PlatformContext for MemRadio {
    fn request_discoverable(&self, mode: i32, duration_secs: u32) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        Self::check_present(&state)?;
        state.requests.push(DiscoverableRequest { mode, duration_secs });
        if state.honor_requests {
            state.scan_mode = mode;
        }
        tracing::debug!(mode, duration_secs, "recorded discoverability request");
        Ok(())
    }
}
