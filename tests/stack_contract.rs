//! Integration tests for the host stack adapter over an in-memory radio.

use std::sync::Arc;

use bthost::platform::mem::{DiscoverableRequest, MemRadio};
use bthost::platform::{scan_mode, PlatformContext, PlatformError, PlatformRadio};
use bthost::stack::{property, InquiryAccess, RemoteDeviceRecord, SecurityOpt, ServiceRecord};
use bthost::{
    BluetoothStack, CapabilitySet, DeviceAddress, DiscoverableMode, HostStack, StackConfig,
    StackError,
};

fn stack_over(radio: &MemRadio) -> HostStack {
    stack_with_config(radio, StackConfig::default())
}

fn stack_with_config(radio: &MemRadio, config: StackConfig) -> HostStack {
    let context: Arc<dyn PlatformContext> = Arc::new(radio.clone());
    let platform: Arc<dyn PlatformRadio> = Arc::new(radio.clone());
    HostStack::initialize(platform, Some(context), config).expect("stack should initialize")
}

fn addr(s: &str) -> DeviceAddress {
    s.parse().expect("test address should parse")
}

mod lifecycle {
    use super::*;

    #[test]
    fn initialize_requires_a_context() {
        let radio: Arc<dyn PlatformRadio> = Arc::new(MemRadio::new());
        let err = HostStack::initialize(radio, None, StackConfig::default())
            .err()
            .expect("initialization should fail");
        assert!(matches!(err, StackError::ContextRequired));
        assert!(err.is_state_error());
    }

    #[test]
    fn initialize_fails_when_no_radio_is_present() {
        let radio = MemRadio::new();
        radio.set_absent(true);
        let context: Arc<dyn PlatformContext> = Arc::new(radio.clone());
        let err = HostStack::initialize(
            Arc::new(radio.clone()),
            Some(context),
            StackConfig::default(),
        )
        .err()
        .expect("initialization should fail");
        assert!(matches!(
            err,
            StackError::Platform(PlatformError::NoRadio)
        ));
        assert!(err.to_string().contains("isn't supported"));
        assert!(err.is_state_error());
    }

    #[test]
    fn powers_radio_on_and_restores_it_at_shutdown() {
        let radio = MemRadio::powered_off();
        let mut stack = stack_over(&radio);
        assert!(radio.enabled());
        assert_eq!(radio.enable_calls(), 1);
        assert!(stack.is_powered().unwrap());

        stack.shutdown();
        assert!(!radio.enabled());
        assert_eq!(radio.disable_calls(), 1);
    }

    #[test]
    fn leaves_an_already_powered_radio_alone() {
        let radio = MemRadio::new();
        let mut stack = stack_over(&radio);
        stack.shutdown();
        assert!(radio.enabled());
        assert_eq!(radio.enable_calls(), 0);
        assert_eq!(radio.disable_calls(), 0);
    }

    #[test]
    fn rejected_power_request_still_initializes() {
        let radio = MemRadio::powered_off();
        radio.set_accept_power_requests(false);
        let mut stack = stack_over(&radio);
        assert!(!stack.is_powered().unwrap());
        assert_eq!(radio.enable_calls(), 1);

        // The stack never turned the radio on, so shutdown must not turn it off.
        stack.shutdown();
        assert_eq!(radio.disable_calls(), 0);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let radio = MemRadio::powered_off();
        let mut stack = stack_over(&radio);
        stack.shutdown();
        stack.shutdown();
        assert_eq!(radio.disable_calls(), 1);
    }

    #[test]
    fn dropping_the_stack_shuts_it_down() {
        let radio = MemRadio::powered_off();
        {
            let _stack = stack_over(&radio);
            assert!(radio.enabled());
        }
        assert!(!radio.enabled());
        assert_eq!(radio.disable_calls(), 1);
    }
}

mod identity {
    use super::*;

    #[test]
    fn reports_backend_address_and_name() {
        let radio = MemRadio::new();
        radio.set_address(addr("00:1A:7D:DA:71:13"));
        radio.set_name("living-room");
        let stack = stack_over(&radio);

        assert_eq!(stack.stack_id(), "mem");
        let address = stack.device_address().unwrap();
        assert_eq!(address.to_string(), "00:1A:7D:DA:71:13");
        assert_eq!(address.plain_hex(), "001A7DDA7113");
        assert_eq!(stack.device_name().unwrap(), "living-room");
    }

    #[test]
    fn device_class_is_not_exposed() {
        let stack = stack_over(&MemRadio::new());
        assert_eq!(stack.device_class(), None);
    }

    #[test]
    fn service_class_updates_are_accepted_and_dropped() {
        let radio = MemRadio::new();
        let mut stack = stack_over(&radio);
        stack.set_service_classes(0x20_0000);
        // Still fully operational afterwards.
        assert!(stack.device_address().is_ok());
    }
}

mod discoverability {
    use super::*;

    #[test]
    fn general_mode_round_trips() {
        let radio = MemRadio::new();
        let stack = stack_over(&radio);

        assert!(stack.set_discoverable(DiscoverableMode::General).unwrap());
        assert_eq!(
            radio.requests(),
            vec![DiscoverableRequest {
                mode: scan_mode::CONNECTABLE_DISCOVERABLE,
                duration_secs: 120,
            }]
        );
        assert_eq!(stack.discoverable().unwrap(), DiscoverableMode::General);
    }

    #[test]
    fn limited_mode_maps_to_connectable() {
        let radio = MemRadio::new();
        let stack = stack_over(&radio);

        assert!(stack.set_discoverable(DiscoverableMode::Limited).unwrap());
        assert_eq!(
            radio.requests(),
            vec![DiscoverableRequest {
                mode: scan_mode::CONNECTABLE,
                duration_secs: 120,
            }]
        );
        assert_eq!(stack.discoverable().unwrap(), DiscoverableMode::Limited);
    }

    #[test]
    fn not_discoverable_requests_zero_duration() {
        let radio = MemRadio::new();
        let stack = stack_over(&radio);

        assert!(stack
            .set_discoverable(DiscoverableMode::NotDiscoverable)
            .unwrap());
        assert_eq!(
            radio.requests(),
            vec![DiscoverableRequest {
                mode: scan_mode::NONE,
                duration_secs: 0,
            }]
        );
        assert_eq!(
            stack.discoverable().unwrap(),
            DiscoverableMode::NotDiscoverable
        );
    }

    #[test]
    fn visibility_window_comes_from_config() {
        let radio = MemRadio::new();
        let stack = stack_with_config(
            &radio,
            StackConfig {
                discoverable_duration: 45,
                ..StackConfig::default()
            },
        );

        stack.set_discoverable(DiscoverableMode::General).unwrap();
        assert_eq!(
            radio.requests(),
            vec![DiscoverableRequest {
                mode: scan_mode::CONNECTABLE_DISCOVERABLE,
                duration_secs: 45,
            }]
        );
    }

    #[test]
    fn request_is_optimistic_when_prompt_goes_unanswered() {
        let radio = MemRadio::new();
        radio.set_honor_requests(false);
        let stack = stack_over(&radio);

        // Issuing the request succeeds even though nothing changed.
        assert!(stack.set_discoverable(DiscoverableMode::General).unwrap());
        assert_eq!(stack.discoverable().unwrap(), DiscoverableMode::Limited);
        assert_eq!(radio.requests().len(), 1);
    }

    #[test]
    #[should_panic(expected = "unrecognized scan mode")]
    fn unknown_platform_scan_mode_panics() {
        let radio = MemRadio::new();
        let stack = stack_over(&radio);
        radio.set_scan_mode(7);
        let _ = stack.discoverable();
    }
}

mod properties {
    use super::*;

    #[test]
    fn capability_table_matches_the_stack_limits() {
        let stack = stack_over(&MemRadio::new());
        let expected = [
            (property::CONNECTED_DEVICES_MAX, "7"),
            (property::SD_TRANS_MAX, "7"),
            (property::CONNECTED_INQUIRY_SCAN, "true"),
            (property::CONNECTED_PAGE_SCAN, "true"),
            (property::CONNECTED_INQUIRY, "true"),
            (property::CONNECTED_PAGE, "true"),
            (property::SD_ATTR_RETRIEVABLE_MAX, "256"),
            (property::MASTER_SWITCH, "false"),
            (property::L2CAP_RECEIVE_MTU_MAX, "0"),
        ];
        for (key, value) in expected {
            assert_eq!(stack.property(key), Some(value), "key {}", key);
        }
    }

    #[test]
    fn unknown_keys_return_none() {
        let stack = stack_over(&MemRadio::new());
        assert_eq!(stack.property("bluetooth.api.version"), None);
        assert_eq!(stack.property(""), None);
    }
}

mod remote_devices {
    use super::*;

    #[test]
    fn bonded_devices_come_from_the_platform_registry() {
        let radio = MemRadio::new();
        radio.add_bonded_device(RemoteDeviceRecord {
            address: addr("00:11:22:33:44:55"),
            name: Some("headset".to_string()),
            bonded: true,
        });
        radio.add_bonded_device(RemoteDeviceRecord {
            address: addr("AA:BB:CC:DD:EE:FF"),
            name: None,
            bonded: true,
        });
        let stack = stack_over(&radio);

        let devices = stack.bonded_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].address, addr("00:11:22:33:44:55"));
        assert_eq!(devices[0].name.as_deref(), Some("headset"));
        assert_eq!(devices[1].name, None);
        assert!(devices.iter().all(|d| d.bonded));
    }

    #[test]
    fn no_bonds_means_an_empty_list() {
        let stack = stack_over(&MemRadio::new());
        assert!(stack.bonded_devices().unwrap().is_empty());
    }

    #[test]
    fn remote_names_resolve_when_cached() {
        let radio = MemRadio::new();
        radio.set_remote_name(addr("00:11:22:33:44:55"), "car-audio");
        let stack = stack_over(&radio);

        assert_eq!(
            stack.remote_device_name(addr("00:11:22:33:44:55")).unwrap(),
            Some("car-audio".to_string())
        );
        assert_eq!(
            stack.remote_device_name(addr("AA:BB:CC:DD:EE:FF")).unwrap(),
            None
        );
    }
}

mod unsupported {
    use super::*;
    use uuid::Uuid;

    fn assert_unsupported<T>(result: Result<T, StackError>, op: &str) {
        match result {
            Err(StackError::NotSupported(name)) => {
                assert_eq!(name, op);
            }
            Err(other) => panic!("{} failed with the wrong error: {}", op, other),
            Ok(_) => panic!("{} should not be supported", op),
        }
    }

    #[test]
    fn every_unimplemented_operation_says_so() {
        let stack = stack_over(&MemRadio::new());
        let peer = addr("00:11:22:33:44:55");
        let handle = bthost::stack::ConnectionHandle(0);
        let mut record = ServiceRecord::default();
        let mut buf = [0u8; 0];

        assert_unsupported(stack.authenticate(peer), "authenticate");
        assert_unsupported(
            stack.authenticate_with_passkey(peer, ""),
            "authenticate_with_passkey",
        );
        assert_unsupported(stack.remove_authentication(peer), "remove_authentication");
        assert_unsupported(stack.is_trusted(peer), "is_trusted");
        assert_unsupported(stack.is_authenticated(peer), "is_authenticated");

        assert_unsupported(stack.start_inquiry(InquiryAccess::General), "start_inquiry");
        assert_unsupported(stack.cancel_inquiry(), "cancel_inquiry");

        assert_unsupported(
            stack.search_services(&[], &[Uuid::nil()], peer),
            "search_services",
        );
        assert_unsupported(stack.cancel_service_search(0), "cancel_service_search");
        assert_unsupported(
            stack.populate_service_record(&mut record, &[]),
            "populate_service_record",
        );

        let params = bthost::stack::ConnectionParams {
            address: peer,
            channel: 1,
            authenticate: false,
            encrypt: false,
            timeout_ms: None,
        };
        assert_unsupported(stack.rf_open_client(&params), "rf_open_client");
        assert_unsupported(stack.rf_close_client(handle), "rf_close_client");
        assert_unsupported(stack.rf_read(handle), "rf_read");
        assert_unsupported(stack.rf_read_buf(handle, &mut buf), "rf_read_buf");
        assert_unsupported(stack.rf_available(handle), "rf_available");
        assert_unsupported(stack.rf_write(handle, 0), "rf_write");
        assert_unsupported(stack.rf_write_buf(handle, &[]), "rf_write_buf");
        assert_unsupported(stack.rf_flush(handle), "rf_flush");
        assert_unsupported(stack.rf_remote_address(handle), "rf_remote_address");
        assert_unsupported(
            stack.rf_security_opt(handle, SecurityOpt::NoAuthNoEncrypt),
            "rf_security_opt",
        );
        assert_unsupported(stack.rf_encrypt(peer, handle, true), "rf_encrypt");

        let server = bthost::stack::ServerParams {
            uuid: Uuid::nil(),
            name: "svc".to_string(),
            authenticate: false,
            encrypt: false,
            authorize: false,
            master: false,
        };
        assert_unsupported(stack.rf_server_open(&server), "rf_server_open");
        assert_unsupported(stack.rf_server_accept(handle), "rf_server_accept");
        assert_unsupported(
            stack.rf_server_update_record(handle, &record, false),
            "rf_server_update_record",
        );
        assert_unsupported(
            stack.rf_server_close_connection(handle),
            "rf_server_close_connection",
        );
        assert_unsupported(stack.rf_server_close(handle), "rf_server_close");

        assert_unsupported(stack.l2_open_client(&params, 672, 672), "l2_open_client");
        assert_unsupported(stack.l2_close_client(handle), "l2_close_client");
        assert_unsupported(
            stack.l2_security_opt(handle, SecurityOpt::NoAuthNoEncrypt),
            "l2_security_opt",
        );
        assert_unsupported(stack.l2_transmit_mtu(handle), "l2_transmit_mtu");
        assert_unsupported(stack.l2_receive_mtu(handle), "l2_receive_mtu");
        assert_unsupported(stack.l2_ready(handle), "l2_ready");
        assert_unsupported(stack.l2_receive(handle, &mut buf), "l2_receive");
        assert_unsupported(stack.l2_send(handle, &[], 672), "l2_send");
        assert_unsupported(stack.l2_remote_address(handle), "l2_remote_address");
        assert_unsupported(stack.l2_encrypt(peer, handle, false), "l2_encrypt");

        assert_unsupported(stack.l2_server_open(&server, 672, 672), "l2_server_open");
        assert_unsupported(stack.l2_server_accept(handle), "l2_server_accept");
        assert_unsupported(
            stack.l2_server_update_record(handle, &record, true),
            "l2_server_update_record",
        );
        assert_unsupported(
            stack.l2_server_close_connection(handle),
            "l2_server_close_connection",
        );
        assert_unsupported(stack.l2_server_close(handle), "l2_server_close");
    }

    #[test]
    fn unsupported_is_not_a_state_error() {
        let stack = stack_over(&MemRadio::new());
        let err = stack.cancel_inquiry().unwrap_err();
        assert!(!err.is_state_error());
        assert!(err.to_string().contains("cancel_inquiry"));
    }

    #[test]
    fn capability_set_names_the_implemented_groups() {
        let stack = stack_over(&MemRadio::new());
        let caps = stack.capabilities();

        assert!(caps.supports(CapabilitySet::POWER_CONTROL));
        assert!(caps.supports(CapabilitySet::DISCOVERABLE_CONTROL));
        assert!(caps.supports(CapabilitySet::BONDED_DEVICES));
        assert!(caps.supports(CapabilitySet::REMOTE_NAMES));

        assert!(!caps.supports(CapabilitySet::INQUIRY));
        assert!(!caps.supports(CapabilitySet::SERVICE_SEARCH));
        assert!(!caps.supports(CapabilitySet::RFCOMM_CLIENT));
        assert!(!caps.supports(CapabilitySet::RFCOMM_SERVER));
        assert!(!caps.supports(CapabilitySet::L2CAP_CLIENT));
        assert!(!caps.supports(CapabilitySet::L2CAP_SERVER));
        assert!(!caps.supports(CapabilitySet::AUTHENTICATION));
        assert!(!caps.supports(CapabilitySet::ENCRYPTION));
    }

    #[test]
    fn platform_failures_surface_after_initialization() {
        let radio = MemRadio::new();
        let stack = stack_over(&radio);
        radio.set_absent(true);

        let err = stack.device_address().unwrap_err();
        assert!(matches!(
            err,
            StackError::Platform(PlatformError::NoRadio)
        ));
        assert!(err.is_state_error());
    }
}

mod platform_probe {
    use super::*;

    // The machine running the tests may or may not expose a usable radio;
    // both outcomes are acceptable, anything else is a bug.
    #[test]
    fn opening_the_default_platform_is_well_behaved() {
        match HostStack::open(StackConfig::default()) {
            Ok(stack) => {
                assert!(!stack.stack_id().is_empty());
            }
            Err(StackError::Unavailable(message)) => {
                assert!(!message.is_empty());
            }
            Err(other) => panic!("unexpected open failure: {}", other),
        }
    }
}
