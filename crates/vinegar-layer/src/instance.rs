//! Instance creation and teardown.

use ash::vk;
use tracing::{debug, error, warn};

use crate::chain;
use crate::dispatch::{resolve, DispatchKey, InstanceDispatch};
use crate::registry::registry;

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_CreateInstance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    vinegar_common::init_layer_logging();

    if p_create_info.is_null() || p_instance.is_null() {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }

    let gipa = match chain::consume_instance_link(p_create_info) {
        Ok(link) => link.get_instance_proc_addr,
        Err(e) => {
            warn!("vkCreateInstance: {}", e);
            return e.to_vk_result();
        }
    };

    let Some(create_instance) = resolve!(
        gipa,
        vk::Instance::null(),
        c"vkCreateInstance",
        vk::PFN_vkCreateInstance
    ) else {
        error!("vkCreateInstance: next layer does not provide vkCreateInstance");
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };

    let result = create_instance(p_create_info, p_allocator, p_instance);
    if result != vk::Result::SUCCESS {
        debug!(?result, "vkCreateInstance failed further down the chain");
        return result;
    }

    let instance = *p_instance;
    match InstanceDispatch::load(instance, gipa) {
        Ok(table) => {
            let key = DispatchKey::of(instance);
            registry().insert_instance(key, table);
            debug!(?instance, "instance chain installed");
            result
        }
        Err(e) => {
            error!("vkCreateInstance: {}", e);
            if let Some(destroy) =
                resolve!(gipa, instance, c"vkDestroyInstance", vk::PFN_vkDestroyInstance)
            {
                destroy(instance, p_allocator);
            }
            e.to_vk_result()
        }
    }
}

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_DestroyInstance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    if instance == vk::Instance::null() {
        return;
    }

    let key = DispatchKey::of(instance);
    let removed = registry().remove_instance(key);

    match removed {
        Some(table) => {
            debug!(?instance, "instance chain removed");
            (table.destroy_instance)(instance, p_allocator);
        }
        None => error!(?instance, "vkDestroyInstance: instance was never registered"),
    }
}
