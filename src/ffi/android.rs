//! Android JNI interface.
//!
//! JNI bindings the Kotlin side calls. The host application owns the real
//! adapter: it seeds a radio bridge at `init`, mirrors radio changes through
//! `setPowered`/`setScanMode`, and polls `nextPrompt` to turn recorded
//! discoverability requests into real system prompts. Every call returns a
//! JSON envelope except `init` (handle) and `shutdown`.

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jboolean, jint, jlong, jstring};
use jni::JNIEnv;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use super::types::*;
use crate::address::DeviceAddress;
use crate::config::StackConfig;
use crate::host::HostStack;
use crate::platform::mem::MemRadio;
use crate::platform::{scan_mode, PlatformContext, PlatformRadio};
use crate::stack::{BluetoothStack, DiscoverableMode, StackError};

struct StackEntry {
    stack: HostStack,
    bridge: MemRadio,
}

// Global registry of live stacks, indexed by handle.
lazy_static::lazy_static! {
    static ref STACKS: Mutex<Vec<Option<StackEntry>>> = Mutex::new(Vec::new());
}

// Log through tracing everywhere and mirror to logcat on device.
macro_rules! a_info {
    ($($arg:tt)*) => {{
        tracing::info!($($arg)*);
        #[cfg(target_os = "android")]
        log::info!($($arg)*);
    }};
}

macro_rules! a_error {
    ($($arg:tt)*) => {{
        tracing::error!($($arg)*);
        #[cfg(target_os = "android")]
        log::error!($($arg)*);
    }};
}

// =============================================================================
// Initialization and lifecycle
// =============================================================================

/// Initialize a stack over a host-seeded radio bridge.
/// Returns a handle to the instance, or -1 on failure.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_init(
    env: JNIEnv,
    _class: JClass,
    config_bytes: JByteArray,
) -> jlong {
    let result: Result<jlong, String> = (|| {
        let config_data: Vec<u8> = env
            .convert_byte_array(&config_bytes)
            .map_err(|e| format!("failed to read config bytes: {}", e))?;

        let seed: BridgeConfig = serde_json::from_slice(&config_data)
            .map_err(|e| format!("failed to parse config: {}", e))?;

        if seed.enable_logging {
            init_logging(seed.log_level.as_deref());
        }

        let bridge = MemRadio::new();
        bridge.set_address(seed.address);
        bridge.set_name(seed.name);
        bridge.set_enabled(seed.enabled);
        bridge.set_scan_mode(seed.scan_mode);
        // The host raises the real prompt; the bridge only records requests.
        bridge.set_honor_requests(false);
        for record in seed.bonded {
            bridge.add_bonded_device(record);
        }

        let mut config = StackConfig::default();
        if let Some(duration) = seed.discoverable_duration {
            config.discoverable_duration = duration;
        }

        let radio: Arc<dyn PlatformRadio> = Arc::new(bridge.clone());
        let context: Arc<dyn PlatformContext> = Arc::new(bridge.clone());
        let stack =
            HostStack::initialize(radio, Some(context), config).map_err(|e| e.to_string())?;

        let mut stacks = STACKS.lock();
        stacks.push(Some(StackEntry { stack, bridge }));
        Ok((stacks.len() - 1) as jlong)
    })();

    match result {
        Ok(handle) => {
            a_info!("stack initialized with handle {}", handle);
            handle
        }
        Err(e) => {
            a_error!("stack init failed: {}", e);
            -1
        }
    }
}

/// Shut the stack down and release its handle. Idempotent.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_shutdown(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    let mut stacks = STACKS.lock();
    if let Some(slot) = stacks.get_mut(handle as usize) {
        if let Some(mut entry) = slot.take() {
            entry.stack.shutdown();
            a_info!("stack handle {} shut down", handle);
        }
    }
}

/// Library version string.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_version(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    let version = env!("CARGO_PKG_VERSION");
    env.new_string(version)
        .expect("Failed to create Java string")
        .into_raw()
}

// =============================================================================
// Stack operations
// =============================================================================

/// Local-radio summary: stack id, address, name, power, capability bits.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_info(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let result = with_entry(handle, |entry| {
        let address = entry.stack.device_address().map_err(|e| e.to_string())?;
        let info = RadioInfo {
            version: FFI_VERSION,
            stack_id: entry.stack.stack_id().to_string(),
            address,
            address_hex: address.plain_hex(),
            name: entry.stack.device_name().map_err(|e| e.to_string())?,
            powered: entry.stack.is_powered().map_err(|e| e.to_string())?,
            capabilities: entry.stack.capabilities().bits(),
        };
        ok_json(info)
    });
    create_result_string(&mut env, result)
}

/// Current discoverable mode.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_discoverable(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let result = with_entry(handle, |entry| stack_json(entry.stack.discoverable()));
    create_result_string(&mut env, result)
}

/// Request a discoverable mode by inquiry access code (GIAC, LIAC or 0).
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_setDiscoverable(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    access_code: jint,
) -> jstring {
    let result = with_entry(handle, |entry| {
        let mode = DiscoverableMode::from_access_code(access_code as u32)
            .ok_or_else(|| format!("unknown inquiry access code: {:#x}", access_code))?;
        stack_json(entry.stack.set_discoverable(mode))
    });
    create_result_string(&mut env, result)
}

/// Devices bonded with this host.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_bondedDevices(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let result = with_entry(handle, |entry| stack_json(entry.stack.bonded_devices()));
    create_result_string(&mut env, result)
}

/// Display name of a remote device, by address in either hexadecimal form.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_remoteName(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    address: JString,
) -> jstring {
    let result = (|| {
        let address: String = env
            .get_string(&address)
            .map_err(|e| format!("failed to read address: {}", e))?
            .into();
        let address: DeviceAddress = address
            .parse()
            .map_err(|e: crate::address::AddressError| e.to_string())?;
        with_entry(handle, |entry| {
            stack_json(entry.stack.remote_device_name(address))
        })
    })();
    create_result_string(&mut env, result)
}

/// Static stack property by key; data is null for unknown keys.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_property(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    key: JString,
) -> jstring {
    let result = (|| {
        let key: String = env
            .get_string(&key)
            .map_err(|e| format!("failed to read key: {}", e))?
            .into();
        with_entry(handle, |entry| {
            ok_json(entry.stack.property(&key).map(str::to_string))
        })
    })();
    create_result_string(&mut env, result)
}

// =============================================================================
// Host-driven bridge API
// =============================================================================

/// Mirror a radio power change from the host into the bridge.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_setPowered(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    enabled: jboolean,
) -> jstring {
    let result = with_entry(handle, |entry| {
        entry.bridge.set_enabled(enabled != 0);
        ok_json(())
    });
    create_result_string(&mut env, result)
}

/// Mirror a scan-mode change from the host into the bridge.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_setScanMode(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    mode: jint,
) -> jstring {
    let result = with_entry(handle, |entry| match mode {
        scan_mode::NONE | scan_mode::CONNECTABLE | scan_mode::CONNECTABLE_DISCOVERABLE => {
            entry.bridge.set_scan_mode(mode);
            ok_json(())
        }
        other => Err(format!("unknown scan mode: {}", other)),
    });
    create_result_string(&mut env, result)
}

/// Oldest pending discoverability request, or null when there is none.
/// The host raises the corresponding system prompt.
#[no_mangle]
pub extern "C" fn Java_dev_bthost_BthostFFI_nextPrompt(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let result = with_entry(handle, |entry| {
        let prompt = entry.bridge.take_request().map(|req| PromptRequest {
            version: FFI_VERSION,
            scan_mode: req.mode,
            duration_secs: req.duration_secs,
        });
        ok_json(prompt)
    });
    create_result_string(&mut env, result)
}

// =============================================================================
// Helper functions
// =============================================================================

fn with_entry<T>(
    handle: jlong,
    f: impl FnOnce(&mut StackEntry) -> Result<T, String>,
) -> Result<T, String> {
    let mut stacks = STACKS.lock();
    let entry = stacks
        .get_mut(handle as usize)
        .and_then(|slot| slot.as_mut())
        .ok_or_else(|| format!("invalid handle: {}", handle))?;
    f(entry)
}

fn ok_json<T: Serialize>(data: T) -> Result<String, String> {
    serde_json::to_string(&FfiResult::success(data))
        .map_err(|e| format!("serialization error: {}", e))
}

fn stack_json<T: Serialize>(result: Result<T, StackError>) -> Result<String, String> {
    match result {
        Ok(data) => ok_json(data),
        Err(e) => serde_json::to_string(&FfiResult::<()>::from_stack_error(&e))
            .map_err(|se| format!("serialization error: {}", se)),
    }
}

fn create_result_string(env: &mut JNIEnv, result: Result<String, String>) -> jstring {
    match result {
        Ok(json) => env
            .new_string(json)
            .expect("Failed to create Java string")
            .into_raw(),
        Err(e) => {
            let error_response: FfiResult<()> = FfiResult::error("ERR_INTERNAL", e);
            let error_json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
                r#"{"ok":false,"code":"ERR_FATAL","message":"Serialization failed"}"#.to_string()
            });
            env.new_string(error_json)
                .expect("Failed to create error string")
                .into_raw()
        }
    }
}

fn init_logging(level: Option<&str>) {
    #[cfg(target_os = "android")]
    {
        let filter = match level {
            Some("trace") => log::LevelFilter::Trace,
            Some("debug") => log::LevelFilter::Debug,
            Some("info") => log::LevelFilter::Info,
            Some("warn") => log::LevelFilter::Warn,
            Some("error") => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        };
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(filter)
                .with_tag("bthost"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        let _ = tracing_subscriber::fmt()
            .with_max_level(parse_log_level(level))
            .try_init();
    }
}

#[cfg(not(target_os = "android"))]
fn parse_log_level(level: Option<&str>) -> tracing::Level {
    match level {
        Some("trace") => tracing::Level::TRACE,
        Some("debug") => tracing::Level::DEBUG,
        Some("info") => tracing::Level::INFO,
        Some("warn") => tracing::Level::WARN,
        Some("error") => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
