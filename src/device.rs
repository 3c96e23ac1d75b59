// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Devices and what they can do.

use crate::imp::{DeviceImp, ExplicitDevice};
use crate::imp::explicit::Driver;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Distinguishes devices within a process. Kernels keep one entry per id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u64);

impl DeviceId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        DeviceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// A Vulkan-class API reached through a [`Driver`].
    Explicit,
    /// The CPU.
    Host,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub backend: BackendKind,
    /// Whether [`crate::queue::Queue::execute_cooperative`] is supported.
    pub cooperative_dispatch: bool,
    /// Whether [`crate::queue::Queue::execute_indirect`] is supported.
    pub indirect_compute: bool,
    pub max_mip_levels: u32,
    /// Largest `x * y * z` work-group size.
    pub max_total_local_size: u32,
}

#[derive(Debug)]
pub struct Device {
    id: DeviceId,
    info: DeviceInfo,
    pub(crate) imp: DeviceImp,
}

impl Device {
    pub(crate) fn explicit(driver: Arc<dyn Driver>, max_mip_levels: Option<u32>, debug_labels: bool) -> Self {
        let capabilities = driver.capabilities();
        let max_mip_levels = match max_mip_levels {
            Some(requested) if requested > capabilities.max_mip_levels => {
                logwise::warn_sync!(
                    "{requested} mip levels requested but the device supports {supported}",
                    requested = requested,
                    supported = capabilities.max_mip_levels
                );
                capabilities.max_mip_levels
            }
            Some(requested) => requested,
            None => capabilities.max_mip_levels,
        };
        let info = DeviceInfo {
            name: capabilities.device_name,
            backend: BackendKind::Explicit,
            cooperative_dispatch: capabilities.cooperative_dispatch,
            indirect_compute: capabilities.indirect_compute,
            max_mip_levels,
            max_total_local_size: capabilities.max_total_local_size,
        };
        logwise::info_sync!("opened device {name}", name = info.name.clone());
        Device {
            id: DeviceId::next(),
            info,
            imp: DeviceImp::Explicit(ExplicitDevice {
                driver,
                queue_family: capabilities.queue_family,
                debug_labels,
            }),
        }
    }

    pub(crate) fn host(name: String, max_mip_levels: Option<u32>) -> Self {
        let info = DeviceInfo {
            name,
            backend: BackendKind::Host,
            cooperative_dispatch: true,
            indirect_compute: true,
            max_mip_levels: max_mip_levels.unwrap_or(HOST_MAX_MIP_LEVELS),
            max_total_local_size: HOST_MAX_TOTAL_LOCAL_SIZE,
        };
        logwise::info_sync!("opened host device {name}", name = info.name.clone());
        Device {
            id: DeviceId::next(),
            info,
            imp: DeviceImp::Host,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }
    pub fn name(&self) -> &str {
        &self.info.name
    }
    pub fn backend(&self) -> BackendKind {
        self.info.backend
    }
}

const HOST_MAX_MIP_LEVELS: u32 = 16;
const HOST_MAX_TOTAL_LOCAL_SIZE: u32 = 1024;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::explicit::simulated::{SimulatedConfig, SimulatedDriver};

    #[test]
    fn ids_are_unique() {
        let a = Device::host("a".to_string(), None);
        let b = Device::host("b".to_string(), None);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn mip_levels_are_capped_by_the_driver() {
        let driver = Arc::new(SimulatedDriver::new(SimulatedConfig {
            max_mip_levels: 8,
            ..SimulatedConfig::default()
        }));
        let device = Device::explicit(driver.clone(), Some(12), false);
        assert_eq!(device.info().max_mip_levels, 8);
        let device = Device::explicit(driver, Some(4), false);
        assert_eq!(device.info().max_mip_levels, 4);
        assert_eq!(device.backend(), BackendKind::Explicit);
    }
}
