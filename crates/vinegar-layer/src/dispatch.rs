//! Dispatch keys and per-object forwarding tables.
//!
//! A layer never sees its own objects, only the handles the loader hands
//! down. What those handles share is the loader's table pointer in their
//! first word: an instance and its physical devices carry one value, a
//! device and its queues another. `DispatchKey` is that word, and the
//! registry maps it to the next layer's entry points.

use std::ffi::c_void;

use ash::vk;
use ash::vk::Handle;

use crate::error::LayerError;

/// `vkGetPhysicalDeviceSurfaceCapabilitiesKHR`
pub type PfnGetPhysicalDeviceSurfaceCapabilities = unsafe extern "system" fn(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_surface_capabilities: *mut vk::SurfaceCapabilitiesKHR,
) -> vk::Result;

/// `vkAcquireNextImageKHR`
pub type PfnAcquireNextImage = unsafe extern "system" fn(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    timeout: u64,
    semaphore: vk::Semaphore,
    fence: vk::Fence,
    p_image_index: *mut u32,
) -> vk::Result;

/// Resolve a command through a next-layer proc-addr function and cast it to
/// its typed function pointer. Evaluates to `Option<$ty>`.
macro_rules! resolve {
    ($gpa:expr, $handle:expr, $name:expr, $ty:ty) => {
        ($gpa)($handle, $name.as_ptr())
            .map(|f| std::mem::transmute::<unsafe extern "system" fn(), $ty>(f))
    };
}
pub(crate) use resolve;

/// Identity of a dispatch chain, read out of a dispatchable handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchKey(usize);

impl DispatchKey {
    /// Read the loader's dispatch pointer out of `handle`.
    ///
    /// # Safety
    /// `handle` must be a live dispatchable handle issued by the loader (or
    /// anything else whose first pointer-sized word is readable).
    pub unsafe fn of<H: Handle>(handle: H) -> Self {
        let slot = handle.as_raw() as usize as *const *const c_void;
        Self(*slot as usize)
    }
}

/// Next-layer entry points kept per `VkInstance`.
#[derive(Clone, Copy)]
pub struct InstanceDispatch {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub destroy_instance: vk::PFN_vkDestroyInstance,
    pub enumerate_device_extension_properties: Option<vk::PFN_vkEnumerateDeviceExtensionProperties>,
    pub get_physical_device_surface_capabilities: Option<PfnGetPhysicalDeviceSurfaceCapabilities>,
}

impl InstanceDispatch {
    /// Resolve the table for a freshly created `instance` through the next
    /// layer's `vkGetInstanceProcAddr`.
    ///
    /// # Safety
    /// `gipa` must be the next layer's resolver and `instance` must have just
    /// been created through it.
    pub unsafe fn load(
        instance: vk::Instance,
        gipa: vk::PFN_vkGetInstanceProcAddr,
    ) -> Result<Self, LayerError> {
        let get_instance_proc_addr = resolve!(
            gipa,
            instance,
            c"vkGetInstanceProcAddr",
            vk::PFN_vkGetInstanceProcAddr
        )
        .ok_or(LayerError::UnresolvedCommand("vkGetInstanceProcAddr"))?;
        let destroy_instance =
            resolve!(gipa, instance, c"vkDestroyInstance", vk::PFN_vkDestroyInstance)
                .ok_or(LayerError::UnresolvedCommand("vkDestroyInstance"))?;

        Ok(Self {
            get_instance_proc_addr,
            destroy_instance,
            enumerate_device_extension_properties: resolve!(
                gipa,
                instance,
                c"vkEnumerateDeviceExtensionProperties",
                vk::PFN_vkEnumerateDeviceExtensionProperties
            ),
            // Absent unless VK_KHR_surface is enabled on the instance.
            get_physical_device_surface_capabilities: resolve!(
                gipa,
                instance,
                c"vkGetPhysicalDeviceSurfaceCapabilitiesKHR",
                PfnGetPhysicalDeviceSurfaceCapabilities
            ),
        })
    }
}

/// Next-layer entry points kept per `VkDevice`.
#[derive(Clone, Copy)]
pub struct DeviceDispatch {
    pub get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
    pub destroy_device: vk::PFN_vkDestroyDevice,
    pub acquire_next_image: Option<PfnAcquireNextImage>,
}

impl DeviceDispatch {
    /// Resolve the table for a freshly created `device` through the next
    /// layer's `vkGetDeviceProcAddr`.
    ///
    /// # Safety
    /// `gdpa` must be the next layer's resolver and `device` must have just
    /// been created through the same chain.
    pub unsafe fn load(
        device: vk::Device,
        gdpa: vk::PFN_vkGetDeviceProcAddr,
    ) -> Result<Self, LayerError> {
        let get_device_proc_addr =
            resolve!(gdpa, device, c"vkGetDeviceProcAddr", vk::PFN_vkGetDeviceProcAddr)
                .ok_or(LayerError::UnresolvedCommand("vkGetDeviceProcAddr"))?;
        let destroy_device = resolve!(gdpa, device, c"vkDestroyDevice", vk::PFN_vkDestroyDevice)
            .ok_or(LayerError::UnresolvedCommand("vkDestroyDevice"))?;

        Ok(Self {
            get_device_proc_addr,
            destroy_device,
            acquire_next_image: resolve!(
                gdpa,
                device,
                c"vkAcquireNextImageKHR",
                PfnAcquireNextImage
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same shape the loader gives dispatchable handles.
    #[repr(C)]
    struct FakeHandle {
        loader_data: usize,
    }

    fn handle_of(fake: &FakeHandle) -> vk::Device {
        vk::Device::from_raw(fake as *const FakeHandle as u64)
    }

    #[test]
    fn test_key_follows_loader_data_not_handle_address() {
        let a = FakeHandle { loader_data: 0xD15A };
        let b = FakeHandle { loader_data: 0xD15A };
        let c = FakeHandle { loader_data: 0xBEEF };

        let (ka, kb, kc) = unsafe {
            (
                DispatchKey::of(handle_of(&a)),
                DispatchKey::of(handle_of(&b)),
                DispatchKey::of(handle_of(&c)),
            )
        };
        assert_eq!(ka, kb);
        assert_ne!(ka, kc);
    }

    #[test]
    fn test_key_is_stable_across_reads() {
        let h = FakeHandle { loader_data: 0x1234_5678 };
        let first = unsafe { DispatchKey::of(handle_of(&h)) };
        let second = unsafe { DispatchKey::of(handle_of(&h)) };
        assert_eq!(first, second);
    }

    unsafe extern "system" fn empty_gdpa(
        _device: vk::Device,
        _p_name: *const std::ffi::c_char,
    ) -> vk::PFN_vkVoidFunction {
        None
    }

    #[test]
    fn test_device_table_requires_next_resolver() {
        let h = FakeHandle { loader_data: 1 };
        let err = unsafe { DeviceDispatch::load(handle_of(&h), empty_gdpa) }.err();
        assert!(matches!(
            err,
            Some(LayerError::UnresolvedCommand("vkGetDeviceProcAddr"))
        ));
    }
}
