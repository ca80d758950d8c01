//! Vinegar Vulkan layer
//!
//! This cdylib sits in the Vulkan loader's layer chain and rewrites the
//! status codes of `vkAcquireNextImageKHR` and
//! `vkGetPhysicalDeviceSurfaceCapabilitiesKHR`, so that a host which ignores
//! stale swapchains still rebuilds them. Everything else is forwarded to the
//! next layer untouched.
//!
//! The loader finds the entry points below through the layer manifest, which
//! maps `vkGetInstanceProcAddr` / `vkGetDeviceProcAddr` to the
//! `VinegarLayer_*` symbols.

#![allow(non_snake_case)]

use std::ffi::{c_char, CStr};

use ash::vk;
use tracing::error;

pub mod chain;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod properties;
pub mod registry;
pub mod swapchain;

pub use error::LayerError;

use device::{VinegarLayer_CreateDevice, VinegarLayer_DestroyDevice};
use instance::{VinegarLayer_CreateInstance, VinegarLayer_DestroyInstance};
use properties::{
    VinegarLayer_EnumerateDeviceExtensionProperties, VinegarLayer_EnumerateDeviceLayerProperties,
    VinegarLayer_EnumerateInstanceExtensionProperties,
    VinegarLayer_EnumerateInstanceLayerProperties,
};
use swapchain::{
    VinegarLayer_AcquireNextImageKHR, VinegarLayer_GetPhysicalDeviceSurfaceCapabilitiesKHR,
};

macro_rules! proc_addr {
    ($f:expr) => {
        Some(std::mem::transmute::<*const (), unsafe extern "system" fn()>(
            $f as *const (),
        ))
    };
}

// ── Command tables ──────────────────────────────────────────

/// Instance-level commands this layer implements.
unsafe fn instance_command(name: &CStr) -> vk::PFN_vkVoidFunction {
    match name.to_bytes() {
        b"vkGetInstanceProcAddr" => proc_addr!(VinegarLayer_GetInstanceProcAddr),
        b"vkEnumerateInstanceLayerProperties" => {
            proc_addr!(VinegarLayer_EnumerateInstanceLayerProperties)
        }
        b"vkEnumerateInstanceExtensionProperties" => {
            proc_addr!(VinegarLayer_EnumerateInstanceExtensionProperties)
        }
        b"vkCreateInstance" => proc_addr!(VinegarLayer_CreateInstance),
        b"vkDestroyInstance" => proc_addr!(VinegarLayer_DestroyInstance),
        b"vkGetPhysicalDeviceSurfaceCapabilitiesKHR" => {
            proc_addr!(VinegarLayer_GetPhysicalDeviceSurfaceCapabilitiesKHR)
        }
        _ => None,
    }
}

/// Device-level commands this layer implements.
unsafe fn device_command(name: &CStr) -> vk::PFN_vkVoidFunction {
    match name.to_bytes() {
        b"vkGetDeviceProcAddr" => proc_addr!(VinegarLayer_GetDeviceProcAddr),
        b"vkEnumerateDeviceLayerProperties" => {
            proc_addr!(VinegarLayer_EnumerateDeviceLayerProperties)
        }
        b"vkEnumerateDeviceExtensionProperties" => {
            proc_addr!(VinegarLayer_EnumerateDeviceExtensionProperties)
        }
        b"vkCreateDevice" => proc_addr!(VinegarLayer_CreateDevice),
        b"vkDestroyDevice" => proc_addr!(VinegarLayer_DestroyDevice),
        b"vkAcquireNextImageKHR" => proc_addr!(VinegarLayer_AcquireNextImageKHR),
        _ => None,
    }
}

// ── Entry points ────────────────────────────────────────────

/// Resolve an instance-level (or device-level) command.
///
/// Our own commands win; everything else is looked up through the next
/// layer for `instance`.
#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_GetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if p_name.is_null() {
        return None;
    }
    let name = CStr::from_ptr(p_name);

    if let Some(f) = instance_command(name).or_else(|| device_command(name)) {
        return Some(f);
    }

    // Global commands we don't implement belong to the loader.
    if instance == vk::Instance::null() {
        return None;
    }

    match registry::instance_dispatch(instance) {
        Ok(table) => (table.get_instance_proc_addr)(instance, p_name),
        Err(e) => {
            error!(?name, "vkGetInstanceProcAddr: {}", e);
            None
        }
    }
}

/// Resolve a device-level command.
#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_GetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if p_name.is_null() {
        return None;
    }
    let name = CStr::from_ptr(p_name);

    if let Some(f) = device_command(name) {
        return Some(f);
    }

    if device == vk::Device::null() {
        return None;
    }

    match registry::device_dispatch(device) {
        Ok(table) => (table.get_device_proc_addr)(device, p_name),
        Err(e) => {
            error!(?name, "vkGetDeviceProcAddr: {}", e);
            None
        }
    }
}
