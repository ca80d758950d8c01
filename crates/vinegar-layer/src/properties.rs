//! Layer and extension enumeration.

use std::ffi::{c_char, CStr};

use ash::vk;
use tracing::error;

use crate::registry;

pub const LAYER_NAME: &CStr = c"VK_LAYER_VINEGAR_VinegarLayer";
pub const LAYER_DESCRIPTION: &CStr = c"Vinegar layer";
pub const IMPLEMENTATION_VERSION: u32 = 1;
pub const SPEC_VERSION: u32 = vk::API_VERSION_1_0;

/// The single `VkLayerProperties` this library reports.
pub fn layer_properties() -> vk::LayerProperties {
    let mut props = vk::LayerProperties::default();
    write_c_string(LAYER_NAME, &mut props.layer_name);
    write_c_string(LAYER_DESCRIPTION, &mut props.description);
    props.implementation_version = IMPLEMENTATION_VERSION;
    props.spec_version = SPEC_VERSION;
    props
}

/// Whether an enumeration call is scoped to this layer.
unsafe fn names_this_layer(p_layer_name: *const c_char) -> bool {
    !p_layer_name.is_null() && CStr::from_ptr(p_layer_name) == LAYER_NAME
}

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_EnumerateInstanceLayerProperties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    if p_property_count.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }

    if p_properties.is_null() {
        *p_property_count = 1;
        return vk::Result::SUCCESS;
    }
    if *p_property_count == 0 {
        return vk::Result::INCOMPLETE;
    }

    *p_properties = layer_properties();
    *p_property_count = 1;
    vk::Result::SUCCESS
}

/// Device layer enumeration is defined to mirror instance layer enumeration.
#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_EnumerateDeviceLayerProperties(
    _physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    VinegarLayer_EnumerateInstanceLayerProperties(p_property_count, p_properties)
}

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_EnumerateInstanceExtensionProperties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    if !names_this_layer(p_layer_name) {
        return vk::Result::ERROR_LAYER_NOT_PRESENT;
    }

    // No extensions of our own
    if !p_property_count.is_null() {
        *p_property_count = 0;
    }
    vk::Result::SUCCESS
}

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_EnumerateDeviceExtensionProperties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    if names_this_layer(p_layer_name) {
        if !p_property_count.is_null() {
            *p_property_count = 0;
        }
        return vk::Result::SUCCESS;
    }

    // Queries about other layers or the driver go down the chain, when
    // there is a chain to go down.
    if physical_device == vk::PhysicalDevice::null() {
        if !p_property_count.is_null() {
            *p_property_count = 0;
        }
        return vk::Result::SUCCESS;
    }

    let next = match registry::instance_dispatch(physical_device) {
        Ok(table) => table.enumerate_device_extension_properties,
        Err(e) => {
            error!("vkEnumerateDeviceExtensionProperties: {}", e);
            return e.to_vk_result();
        }
    };
    match next {
        Some(next) => next(physical_device, p_layer_name, p_property_count, p_properties),
        None => {
            error!("vkEnumerateDeviceExtensionProperties: not provided by the next layer");
            vk::Result::ERROR_INITIALIZATION_FAILED
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────

fn write_c_string(src: &CStr, dst: &mut [c_char]) {
    let bytes = src.to_bytes();
    let len = std::cmp::min(bytes.len(), dst.len() - 1);
    for i in 0..len {
        dst[i] = bytes[i] as c_char;
    }
    dst[len] = 0;
}
