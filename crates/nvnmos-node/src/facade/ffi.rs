//! `extern "C"` embedding shim (spec.md §4.8, §7): null-check every pointer,
//! translate C strings to owned Rust `String`s, catch panics at the boundary,
//! and collapse every failure mode to a boolean.

use std::ffi::{c_char, c_int, CStr};
use std::sync::Arc;

use crate::config::NodeConfig;
use crate::facade::logging::LogCallback;
use crate::facade::NmosNode;

/// Opaque handle returned by [`nvnmos_node_create`].
pub struct NvnmosNodeHandle(NmosNode);

type ActivationFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut std::ffi::c_void);
type LogFn = unsafe extern "C" fn(*const c_char, c_int, *const c_char, *mut std::ffi::c_void);

struct UserData(*mut std::ffi::c_void);
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
}

/// Creates a node from a JSON-encoded [`NodeConfig`]. Returns a null pointer
/// on any failure (malformed JSON, invalid config, runtime start failure).
///
/// # Safety
/// `config_json` must be a valid, nul-terminated C string. `activation_ctx`
/// and `log_ctx` are passed back verbatim to the respective callbacks and
/// are otherwise not touched by this function.
#[no_mangle]
pub unsafe extern "C" fn nvnmos_node_create(
    config_json: *const c_char,
    on_activate: Option<ActivationFn>,
    activation_ctx: *mut std::ffi::c_void,
    on_log: Option<LogFn>,
    log_ctx: *mut std::ffi::c_void,
) -> *mut NvnmosNodeHandle {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let Some(json) = cstr_to_string(config_json) else {
            return None;
        };
        let config: NodeConfig = serde_json::from_str(&json).ok()?;

        let activation_ctx = UserData(activation_ctx);
        let activation_closure = move |id: &str, sdp: &str| {
            if let Some(cb) = on_activate {
                let Ok(id_c) = std::ffi::CString::new(id) else { return };
                let Ok(sdp_c) = std::ffi::CString::new(sdp) else { return };
                unsafe { cb(id_c.as_ptr(), sdp_c.as_ptr(), activation_ctx.0) }
            }
        };

        let log_callback: Option<LogCallback> = on_log.map(|cb| {
            let log_ctx = UserData(log_ctx);
            Arc::new(move |category: &str, level: i32, message: &str| {
                let Ok(cat_c) = std::ffi::CString::new(category) else { return };
                let Ok(msg_c) = std::ffi::CString::new(message) else { return };
                unsafe { cb(cat_c.as_ptr(), level, msg_c.as_ptr(), log_ctx.0) }
            }) as LogCallback
        });

        NmosNode::create(config, activation_closure, log_callback).ok()
    }));

    match result {
        Ok(Some(node)) => Box::into_raw(Box::new(NvnmosNodeHandle(node))),
        _ => std::ptr::null_mut(),
    }
}

/// # Safety
/// `handle` must be a pointer previously returned by [`nvnmos_node_create`]
/// and not already destroyed.
#[no_mangle]
pub unsafe extern "C" fn nvnmos_node_destroy(handle: *mut NvnmosNodeHandle) {
    if handle.is_null() {
        return;
    }
    let boxed = Box::from_raw(handle);
    let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| boxed.0.destroy()));
}

/// # Safety
/// `handle` must be valid; `sdp` must be a nul-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn nvnmos_node_add_sender(handle: *mut NvnmosNodeHandle, sdp: *const c_char) -> c_int {
    if handle.is_null() {
        return 0;
    }
    let Some(sdp) = cstr_to_string(sdp) else { return 0 };
    let node = &(*handle).0;
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| node.add_sender(&sdp).is_ok())).unwrap_or(false) as c_int
}

/// # Safety
/// `handle` must be valid; `internal_id` must be a nul-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn nvnmos_node_remove_sender(handle: *mut NvnmosNodeHandle, internal_id: *const c_char) -> c_int {
    if handle.is_null() {
        return 0;
    }
    let Some(internal_id) = cstr_to_string(internal_id) else { return 0 };
    let node = &(*handle).0;
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| node.remove_sender(&internal_id).is_ok())).unwrap_or(false)
        as c_int
}

/// # Safety
/// `handle` must be valid; `sdp` must be a nul-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn nvnmos_node_add_receiver(handle: *mut NvnmosNodeHandle, sdp: *const c_char) -> c_int {
    if handle.is_null() {
        return 0;
    }
    let Some(sdp) = cstr_to_string(sdp) else { return 0 };
    let node = &(*handle).0;
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| node.add_receiver(&sdp).is_ok())).unwrap_or(false) as c_int
}

/// # Safety
/// `handle` must be valid; `internal_id` must be a nul-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn nvnmos_node_remove_receiver(
    handle: *mut NvnmosNodeHandle,
    internal_id: *const c_char,
) -> c_int {
    if handle.is_null() {
        return 0;
    }
    let Some(internal_id) = cstr_to_string(internal_id) else { return 0 };
    let node = &(*handle).0;
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| node.remove_receiver(&internal_id).is_ok()))
        .unwrap_or(false) as c_int
}

/// # Safety
/// `handle` must be valid; `internal_id` must be a nul-terminated C string;
/// `sdp` may be null or empty to mean "deactivate".
#[no_mangle]
pub unsafe extern "C" fn nvnmos_node_activate(
    handle: *mut NvnmosNodeHandle,
    internal_id: *const c_char,
    sdp: *const c_char,
) -> c_int {
    if handle.is_null() {
        return 0;
    }
    let Some(internal_id) = cstr_to_string(internal_id) else { return 0 };
    let sdp = cstr_to_string(sdp).unwrap_or_default();
    let node = &(*handle).0;
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| node.activate(&internal_id, &sdp).is_ok()))
        .unwrap_or(false) as c_int
}
