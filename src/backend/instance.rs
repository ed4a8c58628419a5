// Instance creation and validation diagnostics
//
// The instance is the first object created and the last destroyed.
// Validation support degrades gracefully: a missing layer or a failed
// messenger is logged and setup continues.

use std::ffi::{c_char, CStr, CString};

use ash::ext::debug_utils;
use ash::{vk, Entry};
use raw_window_handle::RawDisplayHandle;

use crate::error::SetupError;

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Create the Vulkan instance.
///
/// Required extensions are the platform surface extensions for the
/// window's display, plus debug-utils when validation is requested.
pub fn create_instance(
    entry: &Entry,
    display_handle: RawDisplayHandle,
    app_name: &str,
    enable_validation: bool,
) -> Result<ash::Instance, SetupError> {
    if enable_validation && !validation_layer_available(entry) {
        // Recoverable: warn and still hand the layer list to instance
        // creation unchanged (see DESIGN.md).
        log::warn!(
            "validation layer {:?} requested but not available",
            VALIDATION_LAYER
        );
    }

    let app_name = CString::new(app_name).unwrap_or_else(|_| CString::from(c"ember"));
    let engine_name = CString::from(c"ember");

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(&engine_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_1);

    let mut extensions: Vec<*const c_char> =
        ash_window::enumerate_required_extensions(display_handle)
            .map_err(SetupError::InstanceCreation)?
            .to_vec();
    if enable_validation {
        extensions.push(debug_utils::NAME.as_ptr());
    }

    let layers: Vec<*const c_char> = if enable_validation {
        vec![VALIDATION_LAYER.as_ptr()]
    } else {
        Vec::new()
    };

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extensions)
        .enabled_layer_names(&layers);

    let instance = unsafe { entry.create_instance(&create_info, None) }
        .map_err(SetupError::InstanceCreation)?;

    log::info!("Vulkan instance created ({} extensions)", extensions.len());
    Ok(instance)
}

fn validation_layer_available(entry: &Entry) -> bool {
    let layers = match unsafe { entry.enumerate_instance_layer_properties() } {
        Ok(layers) => layers,
        Err(_) => return false,
    };

    layers.iter().any(|props| {
        let name = unsafe { CStr::from_ptr(props.layer_name.as_ptr()) };
        name == VALIDATION_LAYER
    })
}

/// Diagnostic callback registration, alive only while validation is on.
pub struct DebugMessenger {
    loader: debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Attempted only when validation is enabled. Failure here is not
    /// fatal: diagnostics degrade and setup continues.
    pub fn new(entry: &Entry, instance: &ash::Instance) -> Option<Self> {
        let loader = debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        match unsafe { loader.create_debug_utils_messenger(&create_info, None) } {
            Ok(messenger) => Some(Self { loader, messenger }),
            Err(e) => {
                log::warn!("failed to set up debug messenger: {}", e);
                None
            }
        }
    }

    /// Must run before the instance is destroyed.
    pub fn destroy(&mut self) {
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*p_callback_data).p_message);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            log::error!("[vulkan] {}", message.to_string_lossy());
        }
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            log::warn!("[vulkan] {}", message.to_string_lossy());
        }
        _ => {
            log::debug!("[vulkan] {}", message.to_string_lossy());
        }
    }

    vk::FALSE
}
