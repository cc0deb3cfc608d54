//! The stack-adapter contract.
//!
//! A host library selects one [`BluetoothStack`] implementation at runtime
//! and writes all calling code against this trait alone. The surface is wide
//! by construction: it covers discovery, service search and both socket
//! families, and a platform binding is free to implement only a slice of it,
//! failing the rest with [`StackError::NotSupported`]. [`CapabilitySet`]
//! tells callers which slice that is without probing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::address::DeviceAddress;
use crate::platform::PlatformError;

/// Capability-table keys a stack populates.
pub mod property {
    /// Maximum simultaneously connected devices.
    pub const CONNECTED_DEVICES_MAX: &str = "bluetooth.connected.devices.max";
    /// Maximum concurrent service-discovery transactions.
    pub const SD_TRANS_MAX: &str = "bluetooth.sd.trans.max";
    /// Whether inquiry scanning is possible while connected.
    pub const CONNECTED_INQUIRY_SCAN: &str = "bluetooth.connected.inquiry.scan";
    /// Whether page scanning is possible while connected.
    pub const CONNECTED_PAGE_SCAN: &str = "bluetooth.connected.page.scan";
    /// Whether inquiry is possible while connected.
    pub const CONNECTED_INQUIRY: &str = "bluetooth.connected.inquiry";
    /// Whether paging is possible while connected.
    pub const CONNECTED_PAGE: &str = "bluetooth.connected.page";
    /// Maximum attributes retrievable per service record.
    pub const SD_ATTR_RETRIEVABLE_MAX: &str = "bluetooth.sd.attr.retrievable.max";
    /// Whether a master/slave role switch is supported.
    pub const MASTER_SWITCH: &str = "bluetooth.master.switch";
    /// Largest receive MTU an L2CAP channel can be opened with.
    pub const L2CAP_RECEIVE_MTU_MAX: &str = "bluetooth.l2cap.receiveMTU.max";
}

/// Inquiry-visibility states a local radio can be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscoverableMode {
    /// Visible to any scanning device (general/unlimited inquiry).
    General,
    /// Visible to limited-inquiry scans only.
    Limited,
    /// Connectable but not answering inquiry scans.
    NotDiscoverable,
}

impl DiscoverableMode {
    /// The inquiry access code conventionally naming this mode.
    pub const fn access_code(self) -> u32 {
        match self {
            DiscoverableMode::General => 0x9E8B33,
            DiscoverableMode::Limited => 0x9E8B00,
            DiscoverableMode::NotDiscoverable => 0,
        }
    }

    /// Inverse of [`access_code`](Self::access_code).
    pub fn from_access_code(code: u32) -> Option<Self> {
        match code {
            0x9E8B33 => Some(DiscoverableMode::General),
            0x9E8B00 => Some(DiscoverableMode::Limited),
            0 => Some(DiscoverableMode::NotDiscoverable),
            _ => None,
        }
    }
}

/// Access code selecting which devices an inquiry reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InquiryAccess {
    /// General inquiry (GIAC).
    General,
    /// Limited inquiry (LIAC).
    Limited,
}

impl InquiryAccess {
    pub const fn access_code(self) -> u32 {
        match self {
            InquiryAccess::General => 0x9E8B33,
            InquiryAccess::Limited => 0x9E8B00,
        }
    }
}

/// Link security level of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityOpt {
    /// Neither authenticated nor encrypted.
    NoAuthNoEncrypt,
    /// Authenticated link without encryption.
    Authenticate,
    /// Authenticated and encrypted link.
    AuthenticateEncrypt,
}

/// Class-of-Device word as broadcast by a radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceClass(pub u32);

impl DeviceClass {
    /// Major service class bits.
    pub const fn service_classes(self) -> u32 {
        self.0 & 0xFFE000
    }

    /// Major device class bits.
    pub const fn major_device_class(self) -> u32 {
        self.0 & 0x1F00
    }

    /// Minor device class bits.
    pub const fn minor_device_class(self) -> u32 {
        self.0 & 0xFC
    }
}

/// A remote device as reported by the platform's bonded-device registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDeviceRecord {
    /// Normalized 48-bit address.
    pub address: DeviceAddress,
    /// Display name, when the platform has one cached.
    pub name: Option<String>,
    /// Whether the platform considers the device bonded.
    pub bonded: bool,
}

/// Minimal service-record view: a platform handle plus raw attribute values.
///
/// Only the service-discovery operations reference this type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Platform record handle.
    pub handle: u32,
    /// Attribute ID to raw attribute value.
    pub attributes: HashMap<u16, Vec<u8>>,
}

/// Parameters for opening a client connection to a remote service.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub address: DeviceAddress,
    /// RFCOMM channel or L2CAP PSM.
    pub channel: u32,
    pub authenticate: bool,
    pub encrypt: bool,
    /// Connect timeout in milliseconds, `None` to wait indefinitely.
    pub timeout_ms: Option<u64>,
}

/// Parameters for registering a server endpoint and its service record.
#[derive(Debug, Clone)]
pub struct ServerParams {
    /// Service class UUID to advertise.
    pub uuid: Uuid,
    /// Human-readable service name.
    pub name: String,
    pub authenticate: bool,
    pub encrypt: bool,
    /// Require authorization for each incoming connection.
    pub authorize: bool,
    /// Request the master role on accepted links.
    pub master: bool,
}

/// Opaque handle to a platform connection object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle(pub u64);

/// Set of operation groups a stack implementation actually carries.
///
/// Callers branch on this instead of probing operations for
/// [`StackError::NotSupported`]; the error remains the answer for direct
/// calls into an unimplemented group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    /// Local radio power on/off control.
    pub const POWER_CONTROL: CapabilitySet = CapabilitySet(1);
    /// Discoverability get and set.
    pub const DISCOVERABLE_CONTROL: CapabilitySet = CapabilitySet(1 << 1);
    /// Bonded-device enumeration.
    pub const BONDED_DEVICES: CapabilitySet = CapabilitySet(1 << 2);
    /// Remote display-name lookup.
    pub const REMOTE_NAMES: CapabilitySet = CapabilitySet(1 << 3);
    /// Inquiry-based device discovery.
    pub const INQUIRY: CapabilitySet = CapabilitySet(1 << 4);
    /// SDP service search.
    pub const SERVICE_SEARCH: CapabilitySet = CapabilitySet(1 << 5);
    /// Service-record attribute retrieval.
    pub const SERVICE_ATTRIBUTES: CapabilitySet = CapabilitySet(1 << 6);
    /// RFCOMM client connections.
    pub const RFCOMM_CLIENT: CapabilitySet = CapabilitySet(1 << 7);
    /// RFCOMM server endpoints.
    pub const RFCOMM_SERVER: CapabilitySet = CapabilitySet(1 << 8);
    /// L2CAP client connections.
    pub const L2CAP_CLIENT: CapabilitySet = CapabilitySet(1 << 9);
    /// L2CAP server endpoints.
    pub const L2CAP_SERVER: CapabilitySet = CapabilitySet(1 << 10);
    /// Remote-device authentication.
    pub const AUTHENTICATION: CapabilitySet = CapabilitySet(1 << 11);
    /// Link encryption control.
    pub const ENCRYPTION: CapabilitySet = CapabilitySet(1 << 12);
    /// RSSI readouts during discovery.
    pub const RSSI: CapabilitySet = CapabilitySet(1 << 13);

    /// The empty set.
    pub const fn empty() -> Self {
        CapabilitySet(0)
    }

    /// Raw bit representation, for FFI consumers.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every group in `other` is present in `self`.
    pub const fn supports(self, other: CapabilitySet) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for CapabilitySet {
    type Output = CapabilitySet;

    fn bitor(self, rhs: CapabilitySet) -> CapabilitySet {
        CapabilitySet(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CapabilitySet {
    fn bitor_assign(&mut self, rhs: CapabilitySet) {
        self.0 |= rhs.0;
    }
}

/// Errors surfaced by the stack contract.
///
/// Two classes: state errors (the stack cannot be brought up, or a platform
/// call failed underneath it) and [`NotSupported`](StackError::NotSupported)
/// for operations the selected adapter does not implement.
#[derive(Error, Debug)]
pub enum StackError {
    /// The stack cannot be brought up on this host.
    #[error("Bluetooth stack unavailable: {0}")]
    Unavailable(String),

    /// No platform execution context was supplied at initialization.
    #[error("a platform execution context must be supplied before the stack is initialized")]
    ContextRequired,

    /// A platform call failed underneath an otherwise supported operation.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The operation is not implemented by the selected stack adapter.
    #[error("operation not supported by this stack: {0}")]
    NotSupported(&'static str),
}

impl StackError {
    /// True for the state class, i.e. anything except `NotSupported`.
    pub fn is_state_error(&self) -> bool {
        !matches!(self, StackError::NotSupported(_))
    }
}

/// The contract a platform stack binding satisfies.
///
/// All operations are synchronous: none suspends, spawns work or calls back.
/// Blocking operations (accepts, socket reads) block the calling thread on
/// bindings that implement them.
pub trait BluetoothStack: Send + Sync {
    // Lifecycle

    /// Identifier of the selected backend, for runtime stack detection.
    fn stack_id(&self) -> &'static str;

    /// Restore the radio to its pre-initialization power state and release
    /// the platform handle. Safe to call more than once.
    fn shutdown(&mut self);

    /// Operation groups this binding actually carries.
    fn capabilities(&self) -> CapabilitySet;

    // Local identity

    /// Hardware address of the local radio.
    fn device_address(&self) -> Result<DeviceAddress, StackError>;

    /// Friendly name of the local radio.
    fn device_name(&self) -> Result<String, StackError>;

    /// Class of the local device, when the platform exposes one.
    fn device_class(&self) -> Option<DeviceClass>;

    /// Merge `service_classes` bits into the local Class of Device.
    ///
    /// Bindings whose platform has no such control accept and drop the call.
    fn set_service_classes(&mut self, service_classes: u32);

    /// Whether the radio is currently powered.
    fn is_powered(&self) -> Result<bool, StackError>;

    // Discoverability

    /// Request the given inquiry-visibility mode.
    ///
    /// Returns `Ok(true)` once the request has been issued to the platform.
    /// On prompt-driven platforms the user decides asynchronously, so a
    /// successful return does not confirm the mode changed; read
    /// [`discoverable`](Self::discoverable) to confirm.
    fn set_discoverable(&self, mode: DiscoverableMode) -> Result<bool, StackError>;

    /// Current inquiry-visibility mode reported by the platform.
    ///
    /// # Panics
    ///
    /// Panics if the platform reports a scan mode outside its documented
    /// values. That is an environment inconsistency, not a recoverable state.
    fn discoverable(&self) -> Result<DiscoverableMode, StackError>;

    // Capability table

    /// Static stack property for `key`, or `None` when the key is unknown.
    /// See [`property`] for the keys a binding populates.
    fn property(&self, key: &str) -> Option<&str>;

    // Remote devices

    /// Devices previously bonded with this host. Ordering is
    /// platform-defined.
    fn bonded_devices(&self) -> Result<Vec<RemoteDeviceRecord>, StackError>;

    /// Display name of a remote device, when the platform knows one.
    fn remote_device_name(
        &self,
        address: DeviceAddress,
    ) -> Result<Option<String>, StackError>;

    /// Authenticate a remote device.
    fn authenticate(&self, address: DeviceAddress) -> Result<bool, StackError>;

    /// Authenticate a remote device with an explicit passkey.
    fn authenticate_with_passkey(
        &self,
        address: DeviceAddress,
        passkey: &str,
    ) -> Result<bool, StackError>;

    /// Drop stored authentication for a remote device.
    fn remove_authentication(&self, address: DeviceAddress) -> Result<(), StackError>;

    /// Whether the platform trusts the remote device.
    fn is_trusted(&self, address: DeviceAddress) -> Result<bool, StackError>;

    /// Whether the link to the remote device is authenticated.
    fn is_authenticated(&self, address: DeviceAddress) -> Result<bool, StackError>;

    // Discovery

    /// Start an inquiry with the given access code.
    fn start_inquiry(&self, access: InquiryAccess) -> Result<(), StackError>;

    /// Cancel a running inquiry. `Ok(true)` when one was cancelled.
    fn cancel_inquiry(&self) -> Result<bool, StackError>;

    // Service discovery

    /// Start a service search on a remote device. Returns the transaction ID.
    fn search_services(
        &self,
        attr_ids: &[u16],
        uuids: &[Uuid],
        address: DeviceAddress,
    ) -> Result<u32, StackError>;

    /// Cancel a service-search transaction.
    fn cancel_service_search(&self, transaction: u32) -> Result<bool, StackError>;

    /// Fetch the given attributes into `record`.
    fn populate_service_record(
        &self,
        record: &mut ServiceRecord,
        attr_ids: &[u16],
    ) -> Result<(), StackError>;

    // RFCOMM client

    /// Open an RFCOMM client connection.
    fn rf_open_client(
        &self,
        params: &ConnectionParams,
    ) -> Result<ConnectionHandle, StackError>;

    /// Close an RFCOMM client connection.
    fn rf_close_client(&self, handle: ConnectionHandle) -> Result<(), StackError>;

    /// Read one byte; `None` at end of stream.
    fn rf_read(&self, handle: ConnectionHandle) -> Result<Option<u8>, StackError>;

    /// Read into `buf`; returns the number of bytes read.
    fn rf_read_buf(
        &self,
        handle: ConnectionHandle,
        buf: &mut [u8],
    ) -> Result<usize, StackError>;

    /// Bytes readable without blocking.
    fn rf_available(&self, handle: ConnectionHandle) -> Result<usize, StackError>;

    /// Write one byte.
    fn rf_write(&self, handle: ConnectionHandle, byte: u8) -> Result<(), StackError>;

    /// Write a buffer.
    fn rf_write_buf(&self, handle: ConnectionHandle, buf: &[u8]) -> Result<(), StackError>;

    /// Flush buffered writes.
    fn rf_flush(&self, handle: ConnectionHandle) -> Result<(), StackError>;

    /// Remote address of an open RFCOMM connection.
    fn rf_remote_address(
        &self,
        handle: ConnectionHandle,
    ) -> Result<DeviceAddress, StackError>;

    /// Effective security level of an RFCOMM connection.
    fn rf_security_opt(
        &self,
        handle: ConnectionHandle,
        expected: SecurityOpt,
    ) -> Result<SecurityOpt, StackError>;

    /// Toggle encryption on an RFCOMM link.
    fn rf_encrypt(
        &self,
        address: DeviceAddress,
        handle: ConnectionHandle,
        on: bool,
    ) -> Result<bool, StackError>;

    // RFCOMM server

    /// Register an RFCOMM server endpoint and publish its service record.
    fn rf_server_open(&self, params: &ServerParams) -> Result<ConnectionHandle, StackError>;

    /// Block until a client connects; returns the connection handle.
    fn rf_server_accept(
        &self,
        handle: ConnectionHandle,
    ) -> Result<ConnectionHandle, StackError>;

    /// Update the published service record of an RFCOMM endpoint.
    fn rf_server_update_record(
        &self,
        handle: ConnectionHandle,
        record: &ServiceRecord,
        accept_and_open: bool,
    ) -> Result<(), StackError>;

    /// Close one accepted RFCOMM server connection.
    fn rf_server_close_connection(&self, handle: ConnectionHandle) -> Result<(), StackError>;

    /// Unregister an RFCOMM server endpoint.
    fn rf_server_close(&self, handle: ConnectionHandle) -> Result<(), StackError>;

    // L2CAP client

    /// Open an L2CAP client channel with the given MTUs.
    fn l2_open_client(
        &self,
        params: &ConnectionParams,
        receive_mtu: u16,
        transmit_mtu: u16,
    ) -> Result<ConnectionHandle, StackError>;

    /// Close an L2CAP client channel.
    fn l2_close_client(&self, handle: ConnectionHandle) -> Result<(), StackError>;

    /// Effective security level of an L2CAP channel.
    fn l2_security_opt(
        &self,
        handle: ConnectionHandle,
        expected: SecurityOpt,
    ) -> Result<SecurityOpt, StackError>;

    /// Negotiated transmit MTU.
    fn l2_transmit_mtu(&self, handle: ConnectionHandle) -> Result<u16, StackError>;

    /// Negotiated receive MTU.
    fn l2_receive_mtu(&self, handle: ConnectionHandle) -> Result<u16, StackError>;

    /// Whether a packet is ready to receive.
    fn l2_ready(&self, handle: ConnectionHandle) -> Result<bool, StackError>;

    /// Receive one packet into `buf`; returns its length.
    fn l2_receive(
        &self,
        handle: ConnectionHandle,
        buf: &mut [u8],
    ) -> Result<usize, StackError>;

    /// Send one packet of at most `transmit_mtu` bytes.
    fn l2_send(
        &self,
        handle: ConnectionHandle,
        data: &[u8],
        transmit_mtu: u16,
    ) -> Result<(), StackError>;

    /// Remote address of an open L2CAP channel.
    fn l2_remote_address(
        &self,
        handle: ConnectionHandle,
    ) -> Result<DeviceAddress, StackError>;

    /// Toggle encryption on an L2CAP link.
    fn l2_encrypt(
        &self,
        address: DeviceAddress,
        handle: ConnectionHandle,
        on: bool,
    ) -> Result<bool, StackError>;

    // L2CAP server

    /// Register an L2CAP server endpoint with the given MTUs.
    fn l2_server_open(
        &self,
        params: &ServerParams,
        receive_mtu: u16,
        transmit_mtu: u16,
    ) -> Result<ConnectionHandle, StackError>;

    /// Block until a client connects; returns the channel handle.
    fn l2_server_accept(
        &self,
        handle: ConnectionHandle,
    ) -> Result<ConnectionHandle, StackError>;

    /// Update the published service record of an L2CAP endpoint.
    fn l2_server_update_record(
        &self,
        handle: ConnectionHandle,
        record: &ServiceRecord,
        accept_and_open: bool,
    ) -> Result<(), StackError>;

    /// Close one accepted L2CAP server connection.
    fn l2_server_close_connection(&self, handle: ConnectionHandle) -> Result<(), StackError>;

    /// Unregister an L2CAP server endpoint.
    fn l2_server_close(&self, handle: ConnectionHandle) -> Result<(), StackError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_codes_round_trip() {
        for mode in [
            DiscoverableMode::General,
            DiscoverableMode::Limited,
            DiscoverableMode::NotDiscoverable,
        ] {
            assert_eq!(DiscoverableMode::from_access_code(mode.access_code()), Some(mode));
        }
        assert_eq!(DiscoverableMode::from_access_code(0x9E8B01), None);
    }

    #[test]
    fn general_inquiry_codes_match() {
        assert_eq!(InquiryAccess::General.access_code(), 0x9E8B33);
        assert_eq!(
            InquiryAccess::General.access_code(),
            DiscoverableMode::General.access_code()
        );
        assert_eq!(
            InquiryAccess::Limited.access_code(),
            DiscoverableMode::Limited.access_code()
        );
    }

    #[test]
    fn capability_sets_combine() {
        let caps = CapabilitySet::POWER_CONTROL | CapabilitySet::BONDED_DEVICES;
        assert!(caps.supports(CapabilitySet::POWER_CONTROL));
        assert!(caps.supports(CapabilitySet::empty()));
        assert!(!caps.supports(CapabilitySet::RFCOMM_CLIENT));
        assert!(!caps.supports(caps | CapabilitySet::INQUIRY));

        let mut grown = CapabilitySet::empty();
        grown |= CapabilitySet::INQUIRY;
        assert!(grown.supports(CapabilitySet::INQUIRY));
    }

    #[test]
    fn device_class_masks() {
        // Smartphone offering networking: service bits, phone major, smartphone minor.
        let cod = DeviceClass(0x5A_020C);
        assert_eq!(cod.major_device_class(), 0x0200);
        assert_eq!(cod.minor_device_class(), 0x0C);
        assert_eq!(cod.service_classes(), 0x5A_0000);
    }

    #[test]
    fn security_levels_order() {
        assert!(SecurityOpt::NoAuthNoEncrypt < SecurityOpt::Authenticate);
        assert!(SecurityOpt::Authenticate < SecurityOpt::AuthenticateEncrypt);
    }
}
