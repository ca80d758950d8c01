//! Logical device creation and teardown.

use ash::vk;
use tracing::{debug, error, warn};

use crate::chain;
use crate::dispatch::{resolve, DeviceDispatch, DispatchKey};
use crate::registry::registry;

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_CreateDevice(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    if p_create_info.is_null() || p_device.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }

    let link = match chain::consume_device_link(p_create_info) {
        Ok(link) => link,
        Err(e) => {
            warn!("vkCreateDevice: {}", e);
            return e.to_vk_result();
        }
    };

    let Some(create_device) = resolve!(
        link.get_instance_proc_addr,
        vk::Instance::null(),
        c"vkCreateDevice",
        vk::PFN_vkCreateDevice
    ) else {
        error!("vkCreateDevice: next layer does not provide vkCreateDevice");
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };

    let result = create_device(physical_device, p_create_info, p_allocator, p_device);
    if result != vk::Result::SUCCESS {
        debug!(?result, "vkCreateDevice failed further down the chain");
        return result;
    }

    let device = *p_device;
    match DeviceDispatch::load(device, link.get_device_proc_addr) {
        Ok(table) => {
            let key = DispatchKey::of(device);
            registry().insert_device(key, table);
            debug!(?device, ?physical_device, "device chain installed");
            result
        }
        Err(e) => {
            error!("vkCreateDevice: {}", e);
            if let Some(destroy) = resolve!(
                link.get_device_proc_addr,
                device,
                c"vkDestroyDevice",
                vk::PFN_vkDestroyDevice
            ) {
                destroy(device, p_allocator);
            }
            e.to_vk_result()
        }
    }
}

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_DestroyDevice(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    if device == vk::Device::null() {
        return;
    }

    let key = DispatchKey::of(device);
    let removed = registry().remove_device(key);

    match removed {
        Some(table) => {
            debug!(?device, "device chain removed");
            (table.destroy_device)(device, p_allocator);
        }
        None => error!(?device, "vkDestroyDevice: device was never registered"),
    }
}
