//! Swapchain status rewriting.
//!
//! Some hosts ignore `VK_SUBOPTIMAL_KHR` entirely and only half-handle
//! `VK_ERROR_OUT_OF_DATE_KHR`, but reliably rebuild their swapchain when
//! `vkGetPhysicalDeviceSurfaceCapabilitiesKHR` reports
//! `VK_ERROR_SURFACE_LOST_KHR`. Acquisition arms a latch on either status;
//! the next capability query consumes it and reports surface loss.
//!
//! The latch is process-wide, not per swapchain.

use ash::vk;
use tracing::{error, info};

use crate::registry::{self, registry};

/// The pending-recreation hint shared between the two rewritten calls.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecreationLatch {
    pending: bool,
}

impl RecreationLatch {
    pub const fn new() -> Self {
        Self { pending: false }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn arm(&mut self) {
        self.pending = true;
    }

    /// Read and clear.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Apply the acquisition policy to the next layer's result.
    pub fn on_acquire(&mut self, result: vk::Result) -> vk::Result {
        match result {
            // Still presentable, so the host must see a clean success.
            vk::Result::SUBOPTIMAL_KHR => {
                self.arm();
                vk::Result::SUCCESS
            }
            vk::Result::ERROR_OUT_OF_DATE_KHR => {
                self.arm();
                result
            }
            other => other,
        }
    }

    /// Apply the capability-query policy to the next layer's result.
    pub fn on_surface_query(&mut self, result: vk::Result) -> vk::Result {
        if self.take() {
            vk::Result::ERROR_SURFACE_LOST_KHR
        } else {
            result
        }
    }
}

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_GetPhysicalDeviceSurfaceCapabilitiesKHR(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_surface_capabilities: *mut vk::SurfaceCapabilitiesKHR,
) -> vk::Result {
    let next = match registry::instance_dispatch(physical_device) {
        Ok(table) => table.get_physical_device_surface_capabilities,
        Err(e) => {
            error!("vkGetPhysicalDeviceSurfaceCapabilitiesKHR: {}", e);
            return e.to_vk_result();
        }
    };
    let Some(next) = next else {
        error!("vkGetPhysicalDeviceSurfaceCapabilitiesKHR: not provided by the next layer");
        return vk::Result::ERROR_EXTENSION_NOT_PRESENT;
    };

    let result = next(physical_device, surface, p_surface_capabilities);

    let reported = registry().recreation().on_surface_query(result);
    if reported != result {
        info!(
            underlying = ?result,
            "reporting surface loss to force swapchain recreation"
        );
    }
    reported
}

#[no_mangle]
pub unsafe extern "system" fn VinegarLayer_AcquireNextImageKHR(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    timeout: u64,
    semaphore: vk::Semaphore,
    fence: vk::Fence,
    p_image_index: *mut u32,
) -> vk::Result {
    let next = match registry::device_dispatch(device) {
        Ok(table) => table.acquire_next_image,
        Err(e) => {
            error!("vkAcquireNextImageKHR: {}", e);
            return e.to_vk_result();
        }
    };
    let Some(next) = next else {
        error!("vkAcquireNextImageKHR: not provided by the next layer");
        return vk::Result::ERROR_EXTENSION_NOT_PRESENT;
    };

    let result = next(device, swapchain, timeout, semaphore, fence, p_image_index);

    let reported = registry().recreation().on_acquire(result);
    if matches!(
        result,
        vk::Result::SUBOPTIMAL_KHR | vk::Result::ERROR_OUT_OF_DATE_KHR
    ) {
        info!(
            underlying = ?result,
            reported = ?reported,
            "swapchain stale, next surface query will report surface loss"
        );
    }
    reported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suboptimal_is_downgraded_and_arms() {
        let mut latch = RecreationLatch::new();
        assert_eq!(latch.on_acquire(vk::Result::SUBOPTIMAL_KHR), vk::Result::SUCCESS);
        assert!(latch.is_pending());
    }

    #[test]
    fn test_out_of_date_passes_through_and_arms() {
        let mut latch = RecreationLatch::new();
        assert_eq!(
            latch.on_acquire(vk::Result::ERROR_OUT_OF_DATE_KHR),
            vk::Result::ERROR_OUT_OF_DATE_KHR
        );
        assert!(latch.is_pending());
    }

    #[test]
    fn test_other_acquire_results_leave_latch_alone() {
        for result in [
            vk::Result::SUCCESS,
            vk::Result::TIMEOUT,
            vk::Result::NOT_READY,
            vk::Result::ERROR_DEVICE_LOST,
            vk::Result::ERROR_SURFACE_LOST_KHR,
        ] {
            let mut idle = RecreationLatch::new();
            assert_eq!(idle.on_acquire(result), result);
            assert!(!idle.is_pending());

            let mut armed = RecreationLatch::new();
            armed.arm();
            assert_eq!(armed.on_acquire(result), result);
            assert!(armed.is_pending());
        }
    }

    #[test]
    fn test_surface_query_reports_loss_exactly_once() {
        let mut latch = RecreationLatch::new();
        assert_eq!(latch.on_acquire(vk::Result::SUBOPTIMAL_KHR), vk::Result::SUCCESS);

        assert_eq!(
            latch.on_surface_query(vk::Result::SUCCESS),
            vk::Result::ERROR_SURFACE_LOST_KHR
        );
        assert!(!latch.is_pending());
        assert_eq!(latch.on_surface_query(vk::Result::SUCCESS), vk::Result::SUCCESS);
    }

    #[test]
    fn test_surface_loss_overrides_underlying_failure() {
        let mut latch = RecreationLatch::new();
        latch.arm();
        assert_eq!(
            latch.on_surface_query(vk::Result::ERROR_OUT_OF_HOST_MEMORY),
            vk::Result::ERROR_SURFACE_LOST_KHR
        );
    }

    #[test]
    fn test_idle_surface_query_passes_result_through() {
        let mut latch = RecreationLatch::new();
        assert_eq!(
            latch.on_surface_query(vk::Result::ERROR_OUT_OF_HOST_MEMORY),
            vk::Result::ERROR_OUT_OF_HOST_MEMORY
        );
        assert!(!latch.take());
    }
}
