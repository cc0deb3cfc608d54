//! bthost demonstration
//!
//! Walks the stack contract over an in-memory radio and then probes the
//! platform default radio, which may not exist on the machine running this.

use std::sync::Arc;

use bthost::platform::mem::MemRadio;
use bthost::stack::{property, InquiryAccess, RemoteDeviceRecord};
use bthost::{
    BluetoothStack, CapabilitySet, DiscoverableMode, HostStack, StackConfig, StackError,
};
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    info!("🚀 Starting bthost demonstration...");

    // An in-memory radio is always available, so the walkthrough runs anywhere.
    let radio = MemRadio::new();
    radio.add_bonded_device(RemoteDeviceRecord {
        address: "00:11:22:33:44:55".parse()?,
        name: Some("Pixel 8".to_string()),
        bonded: true,
    });
    radio.set_remote_name("00:11:22:33:44:55".parse()?, "Pixel 8");

    let mut stack = HostStack::initialize(
        Arc::new(radio.clone()),
        Some(Arc::new(radio.clone())),
        StackConfig::default(),
    )?;
    info!("✅ Stack initialized on backend '{}'", stack.stack_id());

    // Local identity
    let address = stack.device_address()?;
    info!("   Address: {} (plain form {})", address, address.plain_hex());
    info!("   Name: {}", stack.device_name()?);
    info!("   Powered: {}", stack.is_powered()?);

    // Capability table
    info!("\n📋 Capability table:");
    for key in [
        property::CONNECTED_DEVICES_MAX,
        property::SD_ATTR_RETRIEVABLE_MAX,
        property::L2CAP_RECEIVE_MTU_MAX,
    ] {
        info!("   {} = {:?}", key, stack.property(key));
    }

    // Discoverability round trip
    info!("\n👁  Discoverability:");
    info!("   Before: {:?}", stack.discoverable()?);
    stack.set_discoverable(DiscoverableMode::General)?;
    info!("   After requesting general: {:?}", stack.discoverable()?);
    stack.set_discoverable(DiscoverableMode::NotDiscoverable)?;
    info!("   After requesting not-discoverable: {:?}", stack.discoverable()?);

    // Bonded devices
    info!("\n🤝 Bonded devices:");
    for device in stack.bonded_devices()? {
        info!(
            "   {} ({})",
            device.address,
            device.name.as_deref().unwrap_or("<unnamed>")
        );
        if let Some(name) = stack.remote_device_name(device.address)? {
            info!("   Resolved name: {}", name);
        }
    }

    // Unsupported operation groups fail fast and say so.
    info!("\n🚫 Unsupported operations:");
    match stack.start_inquiry(InquiryAccess::General) {
        Err(StackError::NotSupported(op)) => info!("   start_inquiry -> not supported ({})", op),
        Err(e) => error!("   start_inquiry -> unexpected error: {}", e),
        Ok(_) => error!("   start_inquiry -> unexpectedly succeeded"),
    }

    let caps = stack.capabilities();
    info!(
        "   Capability check: power={} inquiry={} rfcomm_client={}",
        caps.supports(CapabilitySet::POWER_CONTROL),
        caps.supports(CapabilitySet::INQUIRY),
        caps.supports(CapabilitySet::RFCOMM_CLIENT),
    );

    stack.shutdown();
    info!("✅ Stack shut down");

    // The platform default radio may not exist here; failing is fine.
    info!("\n📡 Probing the platform default radio...");
    match HostStack::open(StackConfig::default()) {
        Ok(stack) => {
            info!("   Found backend '{}'", stack.stack_id());
            match stack.device_address() {
                Ok(addr) => info!("   Platform radio address: {}", addr),
                Err(e) => error!("   Could not read address: {}", e),
            }
        }
        Err(e) => info!("   No usable platform radio: {}", e),
    }

    info!("\n🎉 bthost demonstration completed!");
    Ok(())
}
