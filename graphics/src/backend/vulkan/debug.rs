//! Validation layer output and debug object names.

use std::ffi::{CStr, CString};

use ash::vk;

use crate::error::GraphicsError;

/// Create a messenger forwarding validation output to the `log` crate.
pub fn create_debug_messenger(
    debug_utils: &ash::ext::debug_utils::Instance,
) -> Result<vk::DebugUtilsMessengerEXT, GraphicsError> {
    let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback));

    unsafe { debug_utils.create_debug_utils_messenger(&create_info, None) }.map_err(|e| {
        GraphicsError::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
    })
}

/// Attach `label` to a Vulkan object so validation messages and captures
/// name it. Does nothing without the debug utils extension.
pub fn set_object_name<H: vk::Handle>(
    debug_utils: Option<&ash::ext::debug_utils::Device>,
    handle: H,
    label: Option<&str>,
) {
    let (Some(debug_utils), Some(label)) = (debug_utils, label) else {
        return;
    };
    let Ok(name) = CString::new(label) else {
        return;
    };
    let info = vk::DebugUtilsObjectNameInfoEXT::default()
        .object_handle(handle)
        .object_name(&name);
    if let Err(e) = unsafe { debug_utils.set_debug_utils_object_name(&info) } {
        log::trace!("Failed to name object '{}': {:?}", label, e);
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    // SAFETY: the driver passes either null or valid callback data
    let message = unsafe { callback_data.as_ref() }
        .filter(|data| !data.p_message.is_null())
        // SAFETY: p_message is a null-terminated string owned by the driver
        .map(|data| unsafe { CStr::from_ptr(data.p_message) }.to_string_lossy())
        .unwrap_or_else(|| "(no message)".into());

    let kind = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "performance",
        _ => "general",
    };

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("[vulkan {kind}] {message}"),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("[vulkan {kind}] {message}"),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => log::debug!("[vulkan {kind}] {message}"),
        _ => log::trace!("[vulkan {kind}] {message}"),
    }

    vk::FALSE
}
