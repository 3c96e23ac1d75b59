// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! kernels_and_images is a cross-backend resource and execution layer for GPU compute.

It lets calling code allocate device memory, describe pixel formats uniformly, bind kernel
arguments with compile-time type checking and execute work, without depending on any single
vendor API's object model.

| Concern            | Where                 | What you get                                                               |
|--------------------|-----------------------|----------------------------------------------------------------------------|
| Formats            | [`pixel_formats`]     | One `u32` descriptor, `const fn` size math, round-trips to native formats |
| Memory policy      | [`memory_flags`]      | One normalization pass; every correction is logged and returned           |
| Resources          | [`image`], [`buffer`] | Infallible creation, `is_valid()`, layout/access tracking, mip chains     |
| Execution          | [`queue`], [`kernel`] | Type-checked arguments, 1D/2D/3D dispatch, cooperative and indirect work  |
| Devices            | [`context`]           | Explicit (Vulkan-class) devices through a [`explicit::Driver`], or the CPU |

# Backends

Backends are a closed set.

* **Explicit**: a Vulkan-class API reached through the [`explicit::Driver`] trait. This is where the
  interesting state lives: images track their layout and access mask, and every transition records
  at most one barrier. [`explicit::simulated::SimulatedDriver`] implements the trait in process;
  it is the software device for headless use and the test double for everything above it.
* **Host**: buffers and images are host bytes, and kernels are Rust closures run on the
  submitting thread.

Native format tables for Vulkan, Metal, CUDA and OpenCL live in [`pixel_formats`], along with
wgpu's behind the `backend_wgpu` feature.

# Example

```
use kernels_and_images::context::Context;
use kernels_and_images::kernel::{ArgSpec, KernelDesc, KernelProgram};
use kernels_and_images::memory_flags::MemoryFlags;

let context = Context::host();
let queue = context.create_queue(context.device()).unwrap();
let buffer = context.create_buffer(&queue, 16, MemoryFlags::READ_WRITE, None);
let fill = context
    .create_kernel(
        KernelDesc::new("fill").arg(ArgSpec::Buffer).arg(ArgSpec::scalar::<u32>()),
        KernelProgram::host(|item, args| {
            let value: u32 = args.scalar(1).unwrap();
            args.write(0, item.global_id[0] as usize, value);
        }),
    )
    .unwrap();
queue.execute(&fill, 4u32, 2u32, (buffer.clone(), 7u32)).unwrap();
queue.finish().unwrap();
assert_eq!(buffer.read(&queue).unwrap(), [7, 0, 0, 0].repeat(4));
```

# Errors

Configuration problems are soft: flags are corrected, and bad formats or extents produce an
invalid object rather than an error. Driver failures stop the operation in progress and are
returned. Nothing in this crate panics on a driver failure. See [`error`].
*/

pub mod buffer;
pub mod context;
pub mod device;
pub mod error;
pub mod image;
mod imp;
pub mod indirect;
pub mod kernel;
pub mod memory;
pub mod memory_flags;
pub mod pixel_formats;
pub mod queue;

pub use imp::explicit;
