//! Process-wide layer bookkeeping.
//!
//! Forwarding tables for every live instance and device, plus the swapchain
//! recreation latch. One lock guards all of it; callers copy a table out and
//! release the lock before calling down the chain.

use std::collections::BTreeMap;

use ash::vk::Handle;
use parking_lot::{const_mutex, Mutex, MutexGuard};

use crate::dispatch::{DeviceDispatch, DispatchKey, InstanceDispatch};
use crate::error::LayerError;
use crate::swapchain::RecreationLatch;

#[derive(Default)]
pub struct Registry {
    instances: BTreeMap<DispatchKey, InstanceDispatch>,
    devices: BTreeMap<DispatchKey, DeviceDispatch>,
    recreation: RecreationLatch,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            instances: BTreeMap::new(),
            devices: BTreeMap::new(),
            recreation: RecreationLatch::new(),
        }
    }

    /// Register (or replace) the table for an instance chain.
    pub fn insert_instance(&mut self, key: DispatchKey, table: InstanceDispatch) -> bool {
        self.instances.insert(key, table).is_some()
    }

    pub fn instance(&self, key: DispatchKey) -> Option<InstanceDispatch> {
        self.instances.get(&key).copied()
    }

    pub fn remove_instance(&mut self, key: DispatchKey) -> Option<InstanceDispatch> {
        self.instances.remove(&key)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Register (or replace) the table for a device chain.
    pub fn insert_device(&mut self, key: DispatchKey, table: DeviceDispatch) -> bool {
        self.devices.insert(key, table).is_some()
    }

    pub fn device(&self, key: DispatchKey) -> Option<DeviceDispatch> {
        self.devices.get(&key).copied()
    }

    pub fn remove_device(&mut self, key: DispatchKey) -> Option<DeviceDispatch> {
        self.devices.remove(&key)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn recreation(&mut self) -> &mut RecreationLatch {
        &mut self.recreation
    }
}

static REGISTRY: Mutex<Registry> = const_mutex(Registry::new());

/// Lock the global registry.
pub fn registry() -> MutexGuard<'static, Registry> {
    REGISTRY.lock()
}

/// Copy out the instance table for any handle on that instance's chain
/// (the instance itself or one of its physical devices).
///
/// # Safety
/// `handle` must be a live dispatchable handle.
pub unsafe fn instance_dispatch<H: Handle>(handle: H) -> Result<InstanceDispatch, LayerError> {
    let key = DispatchKey::of(handle);
    registry()
        .instance(key)
        .ok_or(LayerError::UnknownHandle("instance"))
}

/// Copy out the device table for any handle on that device's chain.
///
/// # Safety
/// `handle` must be a live dispatchable handle.
pub unsafe fn device_dispatch<H: Handle>(handle: H) -> Result<DeviceDispatch, LayerError> {
    let key = DispatchKey::of(handle);
    registry()
        .device(key)
        .ok_or(LayerError::UnknownHandle("device"))
}

/// Number of live instances we are tracking.
pub fn instance_count() -> usize {
    registry().instance_count()
}

/// Number of live devices we are tracking.
pub fn device_count() -> usize {
    registry().device_count()
}

/// Whether the next surface capability query will report surface loss.
pub fn recreation_pending() -> bool {
    registry().recreation().is_pending()
}
