// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Contexts: the set of devices resources are created for, and the factories that create them.

```
use kernels_and_images::context::Context;
use kernels_and_images::memory_flags::MemoryFlags;
use kernels_and_images::pixel_formats::{ImageExtent, ImageFormat};

let context = Context::simulated();
let queue = context.create_queue(context.device()).unwrap();
let image = context.create_image(
    &queue,
    ImageExtent::new_2d(256, 256),
    ImageFormat::IMAGE_2D.union(ImageFormat::RGBA8),
    MemoryFlags::empty(),
    None,
    None,
);
assert!(image.is_valid());
assert_eq!(image.format().bytes_per_pixel(), 4);
```
*/

use crate::buffer::Buffer;
use crate::device::Device;
use crate::error::{CreateError, DriverError};
use crate::image::Image;
use crate::imp::explicit::image::ExternalImage;
use crate::imp::explicit::kernel::ExplicitKernel;
use crate::imp::explicit::simulated::{SimulatedConfig, SimulatedDriver};
use crate::imp::explicit::Driver;
use crate::imp::{DeviceImp, KernelEntryImp, host};
use crate::kernel::{Kernel, KernelDesc, KernelProgram};
use crate::memory::{ForeignInterop, HostMemory};
use crate::memory_flags::MemoryFlags;
use crate::pixel_formats::{ImageExtent, ImageFormat};
use crate::queue::Queue;
use std::collections::HashMap;
use std::sync::Arc;

/// Which device a configured context opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendChoice {
    /// The CPU.
    Host,
    /// An explicit device backed by [`SimulatedDriver`].
    #[default]
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    pub backend: BackendChoice,
    pub device_name: String,
    /// Caps mip chains below the device's own limit.
    pub max_mip_levels: Option<u32>,
    /// Simulated devices only.
    pub cooperative_dispatch: bool,
    /// Simulated devices only.
    pub indirect_compute: bool,
    /// Names native objects for debugging tools.
    pub debug_labels: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            backend: BackendChoice::default(),
            device_name: "simulated".to_string(),
            max_mip_levels: None,
            cooperative_dispatch: false,
            indirect_compute: true,
            debug_labels: false,
        }
    }
}

impl ContextConfig {
    /**
    The default configuration, adjusted by environment variables:

    * `KAI_BACKEND`: `host` or `simulated`
    * `KAI_MAX_MIP_LEVELS`: a positive integer
    * `KAI_DEBUG_LABELS`: `1` to enable

    Invalid values are ignored with a warning.
    */
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ContextConfig::default();
        if let Some(backend) = lookup("KAI_BACKEND") {
            match backend.as_str() {
                "host" => {
                    config.backend = BackendChoice::Host;
                    config.device_name = "host".to_string();
                }
                "simulated" => config.backend = BackendChoice::Simulated,
                other => logwise::warn_sync!(
                    "unknown KAI_BACKEND {other}, using the default",
                    other = other.to_string()
                ),
            }
        }
        if let Some(levels) = lookup("KAI_MAX_MIP_LEVELS") {
            match levels.parse::<u32>() {
                Ok(levels) if levels > 0 => config.max_mip_levels = Some(levels),
                _ => logwise::warn_sync!(
                    "invalid KAI_MAX_MIP_LEVELS {levels}, ignoring",
                    levels = levels.clone()
                ),
            }
        }
        config.debug_labels = lookup("KAI_DEBUG_LABELS").is_some_and(|v| v == "1");
        config
    }
}

/// A set of devices. Resources are created for one queue's device.
#[derive(Debug)]
pub struct Context {
    devices: Vec<Arc<Device>>,
}

impl Context {
    /// A context with the host device only.
    pub fn host() -> Self {
        Context::with_config(&ContextConfig {
            backend: BackendChoice::Host,
            device_name: "host".to_string(),
            ..ContextConfig::default()
        })
    }

    /// A context with one simulated explicit device.
    pub fn simulated() -> Self {
        Context::with_config(&ContextConfig::default())
    }

    pub fn from_env() -> Self {
        Context::with_config(&ContextConfig::from_env_or_default())
    }

    pub fn with_config(config: &ContextConfig) -> Self {
        let device = match config.backend {
            BackendChoice::Host => Device::host(config.device_name.clone(), config.max_mip_levels),
            BackendChoice::Simulated => {
                let driver = SimulatedDriver::new(SimulatedConfig {
                    device_name: config.device_name.clone(),
                    cooperative_dispatch: config.cooperative_dispatch,
                    indirect_compute: config.indirect_compute,
                    ..SimulatedConfig::default()
                });
                Device::explicit(Arc::new(driver), config.max_mip_levels, config.debug_labels)
            }
        };
        Context {
            devices: vec![Arc::new(device)],
        }
    }

    /// A context with one explicit device reached through `driver`.
    pub fn explicit(driver: Arc<dyn Driver>, config: &ContextConfig) -> Self {
        Context {
            devices: vec![Arc::new(Device::explicit(
                driver,
                config.max_mip_levels,
                config.debug_labels,
            ))],
        }
    }

    /// Adds the devices of `other`.
    pub fn merge(mut self, other: Context) -> Self {
        self.devices.extend(other.devices);
        self
    }

    /// The first device.
    pub fn device(&self) -> &Arc<Device> {
        &self.devices[0]
    }
    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn create_queue(&self, device: &Arc<Device>) -> Result<Arc<Queue>, DriverError> {
        Ok(Arc::new(Queue::new(device.clone())?))
    }

    /// Creates a buffer of `size` bytes. Check [`Buffer::is_valid`] on the result.
    pub fn create_buffer(
        &self,
        queue: &Queue,
        size: u64,
        flags: MemoryFlags,
        host_memory: Option<HostMemory>,
    ) -> Arc<Buffer> {
        Arc::new(Buffer::create(queue, size, flags, host_memory, None))
    }

    /// Creates a buffer shared with a foreign API. See [`MemoryFlags::SHARING`].
    pub fn create_shared_buffer(
        &self,
        queue: &Queue,
        size: u64,
        flags: MemoryFlags,
        interop: ForeignInterop,
    ) -> Arc<Buffer> {
        Arc::new(Buffer::create(queue, size, flags, None, Some(interop)))
    }

    /**
    Creates an image. Check [`Image::is_valid`] on the result.

    `host_memory` holds the initial contents in `format`, every mip level in order, or only level
    0 with [`MemoryFlags::GENERATE_MIP_MAPS`]. With [`MemoryFlags::USE_HOST_MEMORY`] the image
    keeps the bytes up to date with its contents.
    */
    pub fn create_image(
        &self,
        queue: &Queue,
        extent: ImageExtent,
        format: ImageFormat,
        flags: MemoryFlags,
        host_memory: Option<HostMemory>,
        interop: Option<ForeignInterop>,
    ) -> Arc<Image> {
        Arc::new(Image::create(
            queue,
            extent,
            format,
            flags,
            host_memory,
            interop,
        ))
    }

    /// Wraps an image another API created. The result never destroys the native objects.
    pub fn wrap_image(
        &self,
        queue: &Queue,
        external: &ExternalImage,
        flags: MemoryFlags,
    ) -> Arc<Image> {
        Arc::new(Image::wrap(queue, external, flags))
    }

    /// Loads `program` on every device that can run it.
    pub fn create_kernel(
        &self,
        desc: KernelDesc,
        program: KernelProgram,
    ) -> Result<Arc<Kernel>, CreateError> {
        let mut entries = HashMap::new();
        for device in &self.devices {
            let entry = match (&device.imp, &program) {
                (DeviceImp::Explicit(explicit), KernelProgram::Binary(code)) => {
                    KernelEntryImp::Explicit(ExplicitKernel::new(
                        explicit.driver.clone(),
                        desc.name.clone(),
                        code.clone(),
                    ))
                }
                (DeviceImp::Host, KernelProgram::Host(function)) => {
                    KernelEntryImp::Host(host::HostKernel(function.clone()))
                }
                _ => {
                    logwise::trace_sync!(
                        "kernel {name} can't run on {device}",
                        name = desc.name.clone(),
                        device = device.name().to_string()
                    );
                    continue;
                }
            };
            entries.insert(device.id(), entry);
        }
        if entries.is_empty() {
            logwise::error_sync!(
                "no device can run kernel {name}",
                name = desc.name.clone()
            );
            return Err(CreateError::Unsupported("no device can run this kernel program"));
        }
        Ok(Arc::new(Kernel::new(desc, entries)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BackendKind;

    #[test]
    fn environment_selects_the_backend() {
        let config = ContextConfig::from_lookup(|key| match key {
            "KAI_BACKEND" => Some("host".to_string()),
            "KAI_MAX_MIP_LEVELS" => Some("4".to_string()),
            _ => None,
        });
        assert_eq!(config.backend, BackendChoice::Host);
        assert_eq!(config.max_mip_levels, Some(4));
        assert!(!config.debug_labels);
        let context = Context::with_config(&config);
        assert_eq!(context.device().backend(), BackendKind::Host);
        assert_eq!(context.device().info().max_mip_levels, 4);
    }

    #[test]
    fn invalid_environment_values_fall_back() {
        let config = ContextConfig::from_lookup(|key| match key {
            "KAI_BACKEND" => Some("metal".to_string()),
            "KAI_MAX_MIP_LEVELS" => Some("zero".to_string()),
            "KAI_DEBUG_LABELS" => Some("1".to_string()),
            _ => None,
        });
        assert_eq!(config.backend, BackendChoice::Simulated);
        assert_eq!(config.max_mip_levels, None);
        assert!(config.debug_labels);
    }

    #[test]
    fn kernels_load_where_they_can_run() {
        let context = Context::simulated().merge(Context::host());
        let kernel = context
            .create_kernel(KernelDesc::new("noop"), KernelProgram::host(|_, _| {}))
            .unwrap();
        assert!(!kernel.has_entry(&context.devices()[0]));
        assert!(kernel.has_entry(&context.devices()[1]));

        let host_only = Context::host();
        assert_eq!(
            host_only
                .create_kernel(KernelDesc::new("noop"), KernelProgram::Binary(vec![0; 4]))
                .unwrap_err(),
            CreateError::Unsupported("no device can run this kernel program")
        );
    }
}
