//! Host-platform stack adapter.
//!
//! Implements the stack contract by delegating a small set of operations to
//! an injected platform radio and failing the rest as unsupported. The
//! adapter never owns the radio: it powers it on when needed and restores
//! the previous power state at shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::address::DeviceAddress;
use crate::config::StackConfig;
use crate::platform::{self, scan_mode, PlatformContext, PlatformRadio};
use crate::stack::{
    property, BluetoothStack, CapabilitySet, ConnectionHandle, ConnectionParams, DeviceClass,
    DiscoverableMode, InquiryAccess, RemoteDeviceRecord, SecurityOpt, ServerParams,
    ServiceRecord, StackError,
};

/// Stack adapter over the host platform's Bluetooth radio.
///
/// Construct with [`HostStack::open`] to bind the platform default radio, or
/// [`HostStack::initialize`] to supply the collaborators yourself. Dropping
/// the stack shuts it down.
pub struct HostStack {
    radio: Arc<dyn PlatformRadio>,
    context: Arc<dyn PlatformContext>,
    properties: HashMap<&'static str, &'static str>,
    discoverable_duration: u32,
    just_enabled: bool,
    shut_down: bool,
}

impl HostStack {
    /// Acquire the platform default radio and initialize a stack on it.
    pub fn open(config: StackConfig) -> Result<Self, StackError> {
        let (radio, context) = platform::default_platform(config.adapter_name.as_deref())
            .map_err(|e| StackError::Unavailable(e.to_string()))?;
        Self::initialize(radio, Some(context), config)
    }

    /// Initialize a stack over explicit collaborators.
    ///
    /// Fails with [`StackError::ContextRequired`] when no execution context
    /// is supplied. If the radio is off, a power-on request is issued and
    /// remembered so shutdown can restore the prior state; a rejected
    /// request leaves the radio off and initialization still succeeds.
    pub fn initialize(
        radio: Arc<dyn PlatformRadio>,
        context: Option<Arc<dyn PlatformContext>>,
        config: StackConfig,
    ) -> Result<Self, StackError> {
        let context = context.ok_or(StackError::ContextRequired)?;

        let mut just_enabled = false;
        if !radio.is_enabled()? {
            if radio.enable()? {
                just_enabled = true;
                info!(backend = radio.backend(), "powered radio on for stack bring-up");
            } else {
                warn!(backend = radio.backend(), "platform rejected the power-on request");
            }
        }

        Ok(HostStack {
            radio,
            context,
            properties: Self::static_properties(),
            discoverable_duration: config.discoverable_duration,
            just_enabled,
            shut_down: false,
        })
    }

    /// The capability table: fixed limits and feature flags of this adapter.
    fn static_properties() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (property::CONNECTED_DEVICES_MAX, "7"),
            (property::SD_TRANS_MAX, "7"),
            (property::CONNECTED_INQUIRY_SCAN, "true"),
            (property::CONNECTED_PAGE_SCAN, "true"),
            (property::CONNECTED_INQUIRY, "true"),
            (property::CONNECTED_PAGE, "true"),
            (property::SD_ATTR_RETRIEVABLE_MAX, "256"),
            (property::MASTER_SWITCH, "false"),
            (property::L2CAP_RECEIVE_MTU_MAX, "0"),
        ])
    }

    fn raw_scan_mode(mode: DiscoverableMode) -> i32 {
        match mode {
            DiscoverableMode::General => scan_mode::CONNECTABLE_DISCOVERABLE,
            DiscoverableMode::Limited => scan_mode::CONNECTABLE,
            DiscoverableMode::NotDiscoverable => scan_mode::NONE,
        }
    }
}

impl BluetoothStack for HostStack {
    fn stack_id(&self) -> &'static str {
        self.radio.backend()
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if self.just_enabled {
            match self.radio.disable() {
                Ok(_) => info!(backend = self.radio.backend(), "restored radio power state"),
                Err(e) => warn!("failed to power radio back off: {}", e),
            }
        }
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::POWER_CONTROL
            | CapabilitySet::DISCOVERABLE_CONTROL
            | CapabilitySet::BONDED_DEVICES
            | CapabilitySet::REMOTE_NAMES
    }

    fn device_address(&self) -> Result<DeviceAddress, StackError> {
        Ok(self.radio.address()?)
    }

    fn device_name(&self) -> Result<String, StackError> {
        Ok(self.radio.name()?)
    }

    fn device_class(&self) -> Option<DeviceClass> {
        None
    }

    fn set_service_classes(&mut self, service_classes: u32) {
        // The platform offers no way to merge service-class bits; accepted
        // and dropped so callers need not special-case this adapter.
        debug!(service_classes, "ignoring service-class update");
    }

    fn is_powered(&self) -> Result<bool, StackError> {
        Ok(self.radio.is_enabled()?)
    }

    fn set_discoverable(&self, mode: DiscoverableMode) -> Result<bool, StackError> {
        let duration = match mode {
            DiscoverableMode::NotDiscoverable => 0,
            _ => self.discoverable_duration,
        };
        self.context
            .request_discoverable(Self::raw_scan_mode(mode), duration)?;
        debug!(?mode, duration, "issued discoverability request");
        Ok(true)
    }

    fn discoverable(&self) -> Result<DiscoverableMode, StackError> {
        match self.radio.scan_mode()? {
            scan_mode::NONE => Ok(DiscoverableMode::NotDiscoverable),
            scan_mode::CONNECTABLE => Ok(DiscoverableMode::Limited),
            scan_mode::CONNECTABLE_DISCOVERABLE => Ok(DiscoverableMode::General),
            other => panic!("platform returned unrecognized scan mode {}", other),
        }
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).copied()
    }

    fn bonded_devices(&self) -> Result<Vec<RemoteDeviceRecord>, StackError> {
        Ok(self.radio.bonded_devices()?)
    }

    fn remote_device_name(
        &self,
        address: DeviceAddress,
    ) -> Result<Option<String>, StackError> {
        Ok(self.radio.remote_device_name(address)?)
    }

    fn authenticate(&self, _address: DeviceAddress) -> Result<bool, StackError> {
        Err(StackError::NotSupported("authenticate"))
    }

    fn authenticate_with_passkey(
        &self,
        _address: DeviceAddress,
        _passkey: &str,
    ) -> Result<bool, StackError> {
        Err(StackError::NotSupported("authenticate_with_passkey"))
    }

    fn remove_authentication(&self, _address: DeviceAddress) -> Result<(), StackError> {
        Err(StackError::NotSupported("remove_authentication"))
    }

    fn is_trusted(&self, _address: DeviceAddress) -> Result<bool, StackError> {
        Err(StackError::NotSupported("is_trusted"))
    }

    fn is_authenticated(&self, _address: DeviceAddress) -> Result<bool, StackError> {
        Err(StackError::NotSupported("is_authenticated"))
    }

    fn start_inquiry(&self, _access: InquiryAccess) -> Result<(), StackError> {
        Err(StackError::NotSupported("start_inquiry"))
    }

    fn cancel_inquiry(&self) -> Result<bool, StackError> {
        Err(StackError::NotSupported("cancel_inquiry"))
    }

    fn search_services(
        &self,
        _attr_ids: &[u16],
        _uuids: &[Uuid],
        _address: DeviceAddress,
    ) -> Result<u32, StackError> {
        Err(StackError::NotSupported("search_services"))
    }

    fn cancel_service_search(&self, _transaction: u32) -> Result<bool, StackError> {
        Err(StackError::NotSupported("cancel_service_search"))
    }

    fn populate_service_record(
        &self,
        _record: &mut ServiceRecord,
        _attr_ids: &[u16],
    ) -> Result<(), StackError> {
        Err(StackError::NotSupported("populate_service_record"))
    }

    fn rf_open_client(
        &self,
        _params: &ConnectionParams,
    ) -> Result<ConnectionHandle, StackError> {
        Err(StackError::NotSupported("rf_open_client"))
    }

    fn rf_close_client(&self, _handle: ConnectionHandle) -> Result<(), StackError> {
        Err(StackError::NotSupported("rf_close_client"))
    }

    fn rf_read(&self, _handle: ConnectionHandle) -> Result<Option<u8>, StackError> {
        Err(StackError::NotSupported("rf_read"))
    }

    fn rf_read_buf(
        &self,
        _handle: ConnectionHandle,
        _buf: &mut [u8],
    ) -> Result<usize, StackError> {
        Err(StackError::NotSupported("rf_read_buf"))
    }

    fn rf_available(&self, _handle: ConnectionHandle) -> Result<usize, StackError> {
        Err(StackError::NotSupported("rf_available"))
    }

    fn rf_write(&self, _handle: ConnectionHandle, _byte: u8) -> Result<(), StackError> {
        Err(StackError::NotSupported("rf_write"))
    }

    fn rf_write_buf(&self, _handle: ConnectionHandle, _buf: &[u8]) -> Result<(), StackError> {
        Err(StackError::NotSupported("rf_write_buf"))
    }

    fn rf_flush(&self, _handle: ConnectionHandle) -> Result<(), StackError> {
        Err(StackError::NotSupported("rf_flush"))
    }

    fn rf_remote_address(
        &self,
        _handle: ConnectionHandle,
    ) -> Result<DeviceAddress, StackError> {
        Err(StackError::NotSupported("rf_remote_address"))
    }

    fn rf_security_opt(
        &self,
        _handle: ConnectionHandle,
        _expected: SecurityOpt,
    ) -> Result<SecurityOpt, StackError> {
        Err(StackError::NotSupported("rf_security_opt"))
    }

    fn rf_encrypt(
        &self,
        _address: DeviceAddress,
        _handle: ConnectionHandle,
        _on: bool,
    ) -> Result<bool, StackError> {
        Err(StackError::NotSupported("rf_encrypt"))
    }

    fn rf_server_open(&self, _params: &ServerParams) -> Result<ConnectionHandle, StackError> {
        Err(StackError::NotSupported("rf_server_open"))
    }

    fn rf_server_accept(
        &self,
        _handle: ConnectionHandle,
    ) -> Result<ConnectionHandle, StackError> {
        Err(StackError::NotSupported("rf_server_accept"))
    }

    fn rf_server_update_record(
        &self,
        _handle: ConnectionHandle,
        _record: &ServiceRecord,
        _accept_and_open: bool,
    ) -> Result<(), StackError> {
        Err(StackError::NotSupported("rf_server_update_record"))
    }

    fn rf_server_close_connection(&self, _handle: ConnectionHandle) -> Result<(), StackError> {
        Err(StackError::NotSupported("rf_server_close_connection"))
    }

    fn rf_server_close(&self, _handle: ConnectionHandle) -> Result<(), StackError> {
        Err(StackError::NotSupported("rf_server_close"))
    }

    fn l2_open_client(
        &self,
        _params: &ConnectionParams,
        _receive_mtu: u16,
        _transmit_mtu: u16,
    ) -> Result<ConnectionHandle, StackError> {
        Err(StackError::NotSupported("l2_open_client"))
    }

    fn l2_close_client(&self, _handle: ConnectionHandle) -> Result<(), StackError> {
        Err(StackError::NotSupported("l2_close_client"))
    }

    fn l2_security_opt(
        &self,
        _handle: ConnectionHandle,
        _expected: SecurityOpt,
    ) -> Result<SecurityOpt, StackError> {
        Err(StackError::NotSupported("l2_security_opt"))
    }

    fn l2_transmit_mtu(&self, _handle: ConnectionHandle) -> Result<u16, StackError> {
        Err(StackError::NotSupported("l2_transmit_mtu"))
    }

    fn l2_receive_mtu(&self, _handle: ConnectionHandle) -> Result<u16, StackError> {
        Err(StackError::NotSupported("l2_receive_mtu"))
    }

    fn l2_ready(&self, _handle: ConnectionHandle) -> Result<bool, StackError> {
        Err(StackError::NotSupported("l2_ready"))
    }

    fn l2_receive(
        &self,
        _handle: ConnectionHandle,
        _buf: &mut [u8],
    ) -> Result<usize, StackError> {
        Err(StackError::NotSupported("l2_receive"))
    }

    fn l2_send(
        &self,
        _handle: ConnectionHandle,
        _data: &[u8],
        _transmit_mtu: u16,
    ) -> Result<(), StackError> {
        Err(StackError::NotSupported("l2_send"))
    }

    fn l2_remote_address(
        &self,
        _handle: ConnectionHandle,
    ) -> Result<DeviceAddress, StackError> {
        Err(StackError::NotSupported("l2_remote_address"))
    }

    fn l2_encrypt(
        &self,
        _address: DeviceAddress,
        _handle: ConnectionHandle,
        _on: bool,
    ) -> Result<bool, StackError> {
        Err(StackError::NotSupported("l2_encrypt"))
    }

    fn l2_server_open(
        &self,
        _params: &ServerParams,
        _receive_mtu: u16,
        _transmit_mtu: u16,
    ) -> Result<ConnectionHandle, StackError> {
        Err(StackError::NotSupported("l2_server_open"))
    }

    fn l2_server_accept(
        &self,
        _handle: ConnectionHandle,
    ) -> Result<ConnectionHandle, StackError> {
        Err(StackError::NotSupported("l2_server_accept"))
    }

    fn l2_server_update_record(
        &self,
        _handle: ConnectionHandle,
        _record: &ServiceRecord,
        _accept_and_open: bool,
    ) -> Result<(), StackError> {
        Err(StackError::NotSupported("l2_server_update_record"))
    }

    fn l2_server_close_connection(&self, _handle: ConnectionHandle) -> Result<(), StackError> {
        Err(StackError::NotSupported("l2_server_close_connection"))
    }

    fn l2_server_close(&self, _handle: ConnectionHandle) -> Result<(), StackError> {
        Err(StackError::NotSupported("l2_server_close"))
    }
}

impl Drop for HostStack {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_scan_mode_mapping() {
        assert_eq!(
            HostStack::raw_scan_mode(DiscoverableMode::General),
            scan_mode::CONNECTABLE_DISCOVERABLE
        );
        assert_eq!(
            HostStack::raw_scan_mode(DiscoverableMode::Limited),
            scan_mode::CONNECTABLE
        );
        assert_eq!(
            HostStack::raw_scan_mode(DiscoverableMode::NotDiscoverable),
            scan_mode::NONE
        );
    }

    #[test]
    fn capability_table_is_complete() {
        let props = HostStack::static_properties();
        assert_eq!(props.len(), 9);
        assert_eq!(props[property::CONNECTED_DEVICES_MAX], "7");
        assert_eq!(props[property::SD_ATTR_RETRIEVABLE_MAX], "256");
        assert_eq!(props[property::MASTER_SWITCH], "false");
        assert_eq!(props[property::L2CAP_RECEIVE_MTU_MAX], "0");
    }
}
