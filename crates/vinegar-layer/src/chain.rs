//! Loader chain metadata.
//!
//! When a layer's `vkCreateInstance` / `vkCreateDevice` is called, the loader
//! hangs a `VkLayer{Instance,Device}CreateInfo` with `function ==
//! VK_LAYER_LINK_INFO` off the create info's `pNext` chain. Its `pLayerInfo`
//! is a cursor into a list of links, one per remaining layer. Each layer
//! takes the head link and moves the cursor on before calling down, so the
//! next layer finds its own link.
//!
//! These mirror `vk_layer.h`, which is not part of the registry that `ash`
//! is generated from.

use std::ffi::{c_char, c_void};

use ash::vk;

use crate::error::LayerError;

pub const LOADER_INSTANCE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(47);
pub const LOADER_DEVICE_CREATE_INFO: vk::StructureType = vk::StructureType::from_raw(48);

/// `VkLayerFunction`
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerFunction(i32);

impl LayerFunction {
    pub const LINK_INFO: Self = Self(0);
    pub const LOADER_DATA_CALLBACK: Self = Self(1);
    pub const LOADER_LAYER_CREATE_DEVICE_CALLBACK: Self = Self(2);
    pub const LOADER_FEATURES: Self = Self(3);
}

/// `PFN_GetPhysicalDeviceProcAddr`
pub type PfnGetPhysicalDeviceProcAddr =
    unsafe extern "system" fn(instance: vk::Instance, p_name: *const c_char) -> vk::PFN_vkVoidFunction;

#[repr(C)]
pub struct LayerInstanceLink {
    pub p_next: *mut LayerInstanceLink,
    pub pfn_next_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub pfn_next_get_physical_device_proc_addr: Option<PfnGetPhysicalDeviceProcAddr>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union LayerInstanceCreateInfoPayload {
    pub layer_info: *mut LayerInstanceLink,
    pub set_instance_loader_data: *const c_void,
    /// `{ pfnLayerCreateDevice, pfnLayerDestroyDevice }`
    pub layer_device: [*const c_void; 2],
    pub loader_features: u32,
}

#[repr(C)]
pub struct LayerInstanceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerInstanceCreateInfoPayload,
}

#[repr(C)]
pub struct LayerDeviceLink {
    pub p_next: *mut LayerDeviceLink,
    pub pfn_next_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub pfn_next_get_device_proc_addr: Option<vk::PFN_vkGetDeviceProcAddr>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union LayerDeviceCreateInfoPayload {
    pub layer_info: *mut LayerDeviceLink,
    pub set_device_loader_data: *const c_void,
}

#[repr(C)]
pub struct LayerDeviceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerDeviceCreateInfoPayload,
}

/// Walk a `pNext` chain for the loader's link-info node of type `s_type`.
unsafe fn find_link_info(mut node: *const c_void, s_type: vk::StructureType) -> *mut c_void {
    while !node.is_null() {
        let base = &*(node as *const vk::BaseInStructure<'_>);
        // Only loader nodes are large enough to read `function` from. Both
        // loader create infos lay it out at the same offset.
        if base.s_type == s_type {
            let function = (*(node as *const LayerDeviceCreateInfo)).function;
            if function == LayerFunction::LINK_INFO {
                return node as *mut c_void;
            }
        }
        node = base.p_next as *const c_void;
    }
    std::ptr::null_mut()
}

/// What this layer takes out of the instance chain.
#[derive(Clone, Copy)]
pub struct InstanceChainLink {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
}

/// What this layer takes out of the device chain.
#[derive(Clone, Copy)]
pub struct DeviceChainLink {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

/// Take this layer's link from an instance create info and advance the
/// loader's cursor to the next layer's link.
///
/// Single pass: every successful call moves the cursor by exactly one link.
///
/// # Safety
/// `create_info` must point to a valid create info whose `pNext` chain is
/// well formed and writable, as handed to a layer by the loader.
pub unsafe fn consume_instance_link(
    create_info: *const vk::InstanceCreateInfo<'_>,
) -> Result<InstanceChainLink, LayerError> {
    let info = find_link_info((*create_info).p_next, LOADER_INSTANCE_CREATE_INFO)
        as *mut LayerInstanceCreateInfo;
    if info.is_null() {
        return Err(LayerError::MissingLinkInfo);
    }

    let link = (*info).u.layer_info;
    if link.is_null() {
        return Err(LayerError::MissingLinkInfo);
    }
    let get_instance_proc_addr = (*link)
        .pfn_next_get_instance_proc_addr
        .ok_or(LayerError::MissingNextProcAddr)?;

    (*info).u.layer_info = (*link).p_next;

    Ok(InstanceChainLink {
        get_instance_proc_addr,
    })
}

/// Take this layer's link from a device create info and advance the
/// loader's cursor to the next layer's link.
///
/// # Safety
/// Same contract as [`consume_instance_link`].
pub unsafe fn consume_device_link(
    create_info: *const vk::DeviceCreateInfo<'_>,
) -> Result<DeviceChainLink, LayerError> {
    let info = find_link_info((*create_info).p_next, LOADER_DEVICE_CREATE_INFO)
        as *mut LayerDeviceCreateInfo;
    if info.is_null() {
        return Err(LayerError::MissingLinkInfo);
    }

    let link = (*info).u.layer_info;
    if link.is_null() {
        return Err(LayerError::MissingLinkInfo);
    }
    let get_instance_proc_addr = (*link)
        .pfn_next_get_instance_proc_addr
        .ok_or(LayerError::MissingNextProcAddr)?;
    let get_device_proc_addr = (*link)
        .pfn_next_get_device_proc_addr
        .ok_or(LayerError::MissingNextProcAddr)?;

    (*info).u.layer_info = (*link).p_next;

    Ok(DeviceChainLink {
        get_instance_proc_addr,
        get_device_proc_addr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "system" fn first_gipa(_: vk::Instance, _: *const c_char) -> vk::PFN_vkVoidFunction {
        None
    }

    unsafe extern "system" fn second_gipa(_: vk::Instance, _: *const c_char) -> vk::PFN_vkVoidFunction {
        None
    }

    unsafe extern "system" fn gdpa(_: vk::Device, _: *const c_char) -> vk::PFN_vkVoidFunction {
        None
    }

    fn same_fn(a: vk::PFN_vkGetInstanceProcAddr, b: vk::PFN_vkGetInstanceProcAddr) -> bool {
        a as usize == b as usize
    }

    fn instance_links() -> Box<[LayerInstanceLink; 2]> {
        let mut links = Box::new([
            LayerInstanceLink {
                p_next: std::ptr::null_mut(),
                pfn_next_get_instance_proc_addr: Some(first_gipa),
                pfn_next_get_physical_device_proc_addr: None,
            },
            LayerInstanceLink {
                p_next: std::ptr::null_mut(),
                pfn_next_get_instance_proc_addr: Some(second_gipa),
                pfn_next_get_physical_device_proc_addr: None,
            },
        ]);
        let second: *mut LayerInstanceLink = &mut links[1];
        links[0].p_next = second;
        links
    }

    #[test]
    fn test_instance_link_found_behind_foreign_nodes() {
        let mut links = instance_links();
        let second: *mut LayerInstanceLink = &mut links[1];

        let mut link_info = LayerInstanceCreateInfo {
            s_type: LOADER_INSTANCE_CREATE_INFO,
            p_next: std::ptr::null(),
            function: LayerFunction::LINK_INFO,
            u: LayerInstanceCreateInfoPayload {
                layer_info: &mut links[0],
            },
        };
        // Same sType, different function: must be skipped.
        let callback_info = LayerInstanceCreateInfo {
            s_type: LOADER_INSTANCE_CREATE_INFO,
            p_next: &mut link_info as *mut _ as *const c_void,
            function: LayerFunction::LOADER_DATA_CALLBACK,
            u: LayerInstanceCreateInfoPayload {
                set_instance_loader_data: std::ptr::null(),
            },
        };
        let validation = vk::ValidationFeaturesEXT {
            p_next: &callback_info as *const _ as *const c_void,
            ..Default::default()
        };
        let create_info = vk::InstanceCreateInfo {
            p_next: &validation as *const _ as *const c_void,
            ..Default::default()
        };

        let link = unsafe { consume_instance_link(&create_info) }.expect("link info present");
        assert!(same_fn(link.get_instance_proc_addr, first_gipa));
        assert_eq!(unsafe { link_info.u.layer_info }, second);
    }

    #[test]
    fn test_each_consume_advances_one_link() {
        let mut links = instance_links();
        let second: *mut LayerInstanceLink = &mut links[1];
        let mut link_info = LayerInstanceCreateInfo {
            s_type: LOADER_INSTANCE_CREATE_INFO,
            p_next: std::ptr::null(),
            function: LayerFunction::LINK_INFO,
            u: LayerInstanceCreateInfoPayload {
                layer_info: &mut links[0],
            },
        };
        let create_info = vk::InstanceCreateInfo {
            p_next: &mut link_info as *mut _ as *const c_void,
            ..Default::default()
        };

        let first = unsafe { consume_instance_link(&create_info) }.expect("first link");
        assert!(same_fn(first.get_instance_proc_addr, first_gipa));
        assert_eq!(unsafe { link_info.u.layer_info }, second);

        let next = unsafe { consume_instance_link(&create_info) }.expect("second link");
        assert!(same_fn(next.get_instance_proc_addr, second_gipa));
        assert!(unsafe { link_info.u.layer_info }.is_null());

        let exhausted = unsafe { consume_instance_link(&create_info) };
        assert!(matches!(exhausted, Err(LayerError::MissingLinkInfo)));
    }

    #[test]
    fn test_missing_instance_link_info() {
        let create_info = vk::InstanceCreateInfo::default();
        let result = unsafe { consume_instance_link(&create_info) };
        assert!(matches!(result, Err(LayerError::MissingLinkInfo)));
    }

    #[test]
    fn test_instance_sttype_is_not_accepted_for_device() {
        let mut links = instance_links();
        let mut link_info = LayerInstanceCreateInfo {
            s_type: LOADER_INSTANCE_CREATE_INFO,
            p_next: std::ptr::null(),
            function: LayerFunction::LINK_INFO,
            u: LayerInstanceCreateInfoPayload {
                layer_info: &mut links[0],
            },
        };
        let create_info = vk::DeviceCreateInfo {
            p_next: &mut link_info as *mut _ as *const c_void,
            ..Default::default()
        };
        let result = unsafe { consume_device_link(&create_info) };
        assert!(matches!(result, Err(LayerError::MissingLinkInfo)));
    }

    #[test]
    fn test_device_link_requires_both_resolvers() {
        let mut link = LayerDeviceLink {
            p_next: std::ptr::null_mut(),
            pfn_next_get_instance_proc_addr: Some(first_gipa),
            pfn_next_get_device_proc_addr: None,
        };
        let mut link_info = LayerDeviceCreateInfo {
            s_type: LOADER_DEVICE_CREATE_INFO,
            p_next: std::ptr::null(),
            function: LayerFunction::LINK_INFO,
            u: LayerDeviceCreateInfoPayload {
                layer_info: &mut link,
            },
        };
        let create_info = vk::DeviceCreateInfo {
            p_next: &mut link_info as *mut _ as *const c_void,
            ..Default::default()
        };

        let result = unsafe { consume_device_link(&create_info) };
        assert!(matches!(result, Err(LayerError::MissingNextProcAddr)));
        // A rejected link leaves the cursor where it was.
        assert_eq!(unsafe { link_info.u.layer_info }, &mut link as *mut LayerDeviceLink);

        link.pfn_next_get_device_proc_addr = Some(gdpa);
        let link_out = unsafe { consume_device_link(&create_info) }.expect("device link");
        assert_eq!(link_out.get_device_proc_addr as usize, gdpa as usize);
        assert!(unsafe { link_info.u.layer_info }.is_null());
    }
}
