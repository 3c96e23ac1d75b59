// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Queues and kernel dispatch.

A [`Queue`] is the ordered submission channel of one device. Dispatching enqueues work and
returns; it does not wait for the work to complete. [`Queue::finish`] does.

Work can also be collected in a [`CommandRecording`] and submitted in one go, or discarded
without ever running. Transitions and copies accept a recording too, in which case they take
effect in recording order once it is submitted.

Global and local sizes share one [`WorkSize`] type, so their dimensionality always agrees:

```
use kernels_and_images::context::Context;
use kernels_and_images::kernel::{ArgSpec, KernelDesc, KernelProgram};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

let context = Context::host();
let queue = context.create_queue(context.device()).unwrap();
let count = Arc::new(AtomicU32::new(0));
let counter = count.clone();
let kernel = context
    .create_kernel(
        KernelDesc::new("count").arg(ArgSpec::scalar::<u32>()),
        KernelProgram::host(move |_item, args| {
            let step: u32 = args.scalar(0).unwrap();
            counter.fetch_add(step, Ordering::Relaxed);
        }),
    )
    .unwrap();
queue.execute(&kernel, [8, 4], [4, 4], (2u32,)).unwrap();
queue.finish().unwrap();
assert_eq!(count.load(Ordering::Relaxed), 64);
```
*/

use crate::device::Device;
use crate::error::{DriverError, ExecuteError};
use crate::imp::explicit::BoundArgument;
use crate::imp::explicit::kernel::ExplicitKernel;
use crate::imp::explicit::queue::{ExplicitQueue, ExplicitRecording};
use crate::imp::host::{self, HostQueue, HostRecording};
use crate::imp::{DeviceImp, KernelEntryImp, QueueImp, RecordingImp};
use crate::indirect::{ALL_COMMANDS, IndirectCommandPipeline};
use crate::kernel::{ArgSpec, ArgValue, Kernel, KernelArgs};
use crate::pixel_formats::Access;
use std::sync::Arc;

mod sealed {
    pub trait Sealed {}
}

/// A 1D, 2D or 3D work size. Missing dimensions are 1.
pub trait WorkSize: Copy + sealed::Sealed {
    fn to_3d(self) -> [u32; 3];
}

impl sealed::Sealed for u32 {}
impl WorkSize for u32 {
    fn to_3d(self) -> [u32; 3] {
        [self, 1, 1]
    }
}
impl sealed::Sealed for [u32; 1] {}
impl WorkSize for [u32; 1] {
    fn to_3d(self) -> [u32; 3] {
        [self[0], 1, 1]
    }
}
impl sealed::Sealed for [u32; 2] {}
impl WorkSize for [u32; 2] {
    fn to_3d(self) -> [u32; 3] {
        [self[0], self[1], 1]
    }
}
impl sealed::Sealed for [u32; 3] {}
impl WorkSize for [u32; 3] {
    fn to_3d(self) -> [u32; 3] {
        self
    }
}

#[derive(Debug)]
pub struct Queue {
    device: Arc<Device>,
    pub(crate) imp: QueueImp,
}

impl Queue {
    pub(crate) fn new(device: Arc<Device>) -> Result<Self, DriverError> {
        let imp = match &device.imp {
            DeviceImp::Explicit(explicit) => QueueImp::Explicit(ExplicitQueue::new(
                explicit.driver.clone(),
                explicit.queue_family,
            )?),
            DeviceImp::Host => QueueImp::Host(HostQueue::default()),
        };
        Ok(Queue { device, imp })
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Dispatches `kernel` over `global_size` work-items in groups of `local_size`.
    pub fn execute<W: WorkSize, A: KernelArgs>(
        &self,
        kernel: &Arc<Kernel>,
        global_size: W,
        local_size: W,
        args: A,
    ) -> Result<(), ExecuteError> {
        self.dispatch(
            None,
            kernel,
            global_size.to_3d(),
            local_size.to_3d(),
            args.into_args(),
            false,
        )
    }

    /// Like [`Queue::execute`], with all work-groups resident at once so they can synchronize.
    /// Fails on devices without cooperative dispatch.
    pub fn execute_cooperative<W: WorkSize, A: KernelArgs>(
        &self,
        kernel: &Arc<Kernel>,
        global_size: W,
        local_size: W,
        args: A,
    ) -> Result<(), ExecuteError> {
        self.dispatch(
            None,
            kernel,
            global_size.to_3d(),
            local_size.to_3d(),
            args.into_args(),
            true,
        )
    }

    /**
    Replays `count` commands of `pipeline` starting at `offset`, in one submission.

    [`ALL_COMMANDS`] runs everything from `offset` to the end.
    */
    pub fn execute_indirect(
        &self,
        pipeline: &IndirectCommandPipeline,
        offset: u32,
        count: u32,
    ) -> Result<(), ExecuteError> {
        let mut recording = self.begin_recording()?;
        recording.execute_indirect(pipeline, offset, count)?;
        recording.submit()
    }

    pub fn execute_indirect_all(&self, pipeline: &IndirectCommandPipeline) -> Result<(), ExecuteError> {
        self.execute_indirect(pipeline, 0, ALL_COMMANDS)
    }

    fn dispatch(
        &self,
        recording: Option<&mut RecordingImp>,
        kernel: &Arc<Kernel>,
        global_size: [u32; 3],
        local_size: [u32; 3],
        args: Vec<ArgValue>,
        cooperative: bool,
    ) -> Result<(), ExecuteError> {
        let info = self.device.info();
        if cooperative && !info.cooperative_dispatch {
            logwise::error_sync!(
                "cooperative dispatch of {kernel} on a device without support",
                kernel = kernel.name().to_string()
            );
            return Err(ExecuteError::CooperativeUnsupported);
        }
        let desc = kernel.desc();
        desc.validate_local_size(local_size, Some(info.max_total_local_size))?;
        desc.validate_args(&args)?;
        let groups: [u32; 3] = std::array::from_fn(|d| global_size[d].div_ceil(local_size[d]));
        match (kernel.entry(self.device.id())?, &self.imp, recording) {
            (KernelEntryImp::Explicit(entry), _, Some(RecordingImp::Explicit(recording))) => {
                self.encode(recording, kernel, entry, local_size, groups, args)
            }
            (KernelEntryImp::Explicit(entry), QueueImp::Explicit(queue), None) => {
                let mut recording = queue.begin()?;
                self.encode(&mut recording, kernel, entry, local_size, groups, args)?;
                queue.submit(recording)?;
                Ok(())
            }
            (KernelEntryImp::Host(entry), _, Some(RecordingImp::Host(recording))) => {
                recording.push(entry.clone(), global_size, local_size, args);
                Ok(())
            }
            (KernelEntryImp::Host(entry), QueueImp::Host(_), None) => {
                host::run(entry, global_size, local_size, &args)
            }
            _ => Err(ExecuteError::InvalidObject),
        }
    }

    /// Records argument transitions, bindings and the dispatch, and keeps the arguments alive
    /// until the recording completes.
    fn encode(
        &self,
        recording: &mut ExplicitRecording,
        kernel: &Arc<Kernel>,
        entry: &ExplicitKernel,
        local_size: [u32; 3],
        groups: [u32; 3],
        args: Vec<ArgValue>,
    ) -> Result<(), ExecuteError> {
        let device = self.device.id();
        let mut bound = Vec::with_capacity(args.len());
        for (spec, arg) in kernel.desc().args.iter().zip(&args) {
            let owner = match arg {
                ArgValue::Scalar(_) => None,
                ArgValue::Buffer(buffer) => buffer.device(),
                ArgValue::ArgumentBuffer(buffer) => buffer.buffer().device(),
                ArgValue::Image(image) => image.device(),
            };
            if let Some(owner) = owner
                && owner.id() != device
            {
                return Err(ExecuteError::InvalidObject);
            }
            bound.push(match (spec, arg) {
                (_, ArgValue::Scalar(bytes)) => BoundArgument::Bytes(bytes.clone()),
                (_, ArgValue::Buffer(buffer)) => BoundArgument::Buffer(buffer.explicit_handle()?),
                (_, ArgValue::ArgumentBuffer(buffer)) => {
                    BoundArgument::Buffer(buffer.buffer().explicit_handle()?)
                }
                (ArgSpec::Image { access }, ArgValue::Image(image)) => {
                    image.bind_explicit(recording, *access)?
                }
                (_, ArgValue::Image(image)) => image.bind_explicit(recording, Access::ReadWrite)?,
            });
        }
        entry.record(recording, local_size, groups, &bound)?;
        recording.retain(kernel, args);
        Ok(())
    }

    /// Blocks until all submitted work completed, then releases what it retained.
    pub fn finish(&self) -> Result<(), DriverError> {
        match &self.imp {
            QueueImp::Explicit(queue) => queue.finish(),
            QueueImp::Host(_) => Ok(()),
        }
    }

    /// Releases submissions that already completed, without blocking.
    pub fn flush(&self) {
        if let QueueImp::Explicit(queue) = &self.imp {
            queue.flush();
        }
    }

    /// Submissions not yet released by [`Queue::finish`] or [`Queue::flush`].
    pub fn pending_submissions(&self) -> usize {
        match &self.imp {
            QueueImp::Explicit(queue) => queue.pending_count(),
            QueueImp::Host(_) => 0,
        }
    }

    pub fn start_profiling(&self) {
        match &self.imp {
            QueueImp::Explicit(queue) => queue.start_profiling(),
            QueueImp::Host(queue) => queue.start_profiling(),
        }
    }

    /// Finishes outstanding work and returns the microseconds since [`Queue::start_profiling`],
    /// or 0 if profiling was not started.
    pub fn stop_profiling(&self) -> Result<u64, DriverError> {
        match &self.imp {
            QueueImp::Explicit(queue) => queue.stop_profiling(),
            QueueImp::Host(queue) => Ok(queue.stop_profiling()),
        }
    }

    pub fn begin_recording(&self) -> Result<CommandRecording<'_>, DriverError> {
        let imp = match &self.imp {
            QueueImp::Explicit(queue) => RecordingImp::Explicit(queue.begin()?),
            QueueImp::Host(_) => RecordingImp::Host(HostRecording::default()),
        };
        Ok(CommandRecording { queue: self, imp })
    }
}

/// Commands collected for one submission. Dropping it discards them.
#[derive(Debug)]
pub struct CommandRecording<'q> {
    queue: &'q Queue,
    imp: RecordingImp,
}

impl<'q> CommandRecording<'q> {
    pub fn queue(&self) -> &'q Queue {
        self.queue
    }

    pub(crate) fn imp_mut(&mut self) -> &mut RecordingImp {
        &mut self.imp
    }

    pub fn execute<W: WorkSize, A: KernelArgs>(
        &mut self,
        kernel: &Arc<Kernel>,
        global_size: W,
        local_size: W,
        args: A,
    ) -> Result<(), ExecuteError> {
        self.queue.dispatch(
            Some(&mut self.imp),
            kernel,
            global_size.to_3d(),
            local_size.to_3d(),
            args.into_args(),
            false,
        )
    }

    pub fn execute_cooperative<W: WorkSize, A: KernelArgs>(
        &mut self,
        kernel: &Arc<Kernel>,
        global_size: W,
        local_size: W,
        args: A,
    ) -> Result<(), ExecuteError> {
        self.queue.dispatch(
            Some(&mut self.imp),
            kernel,
            global_size.to_3d(),
            local_size.to_3d(),
            args.into_args(),
            true,
        )
    }

    /// Records commands of `pipeline`. See [`Queue::execute_indirect`].
    pub fn execute_indirect(
        &mut self,
        pipeline: &IndirectCommandPipeline,
        offset: u32,
        count: u32,
    ) -> Result<(), ExecuteError> {
        if !self.queue.device.info().indirect_compute {
            logwise::error_sync!("indirect execution on a device without support");
            return Err(ExecuteError::IndirectUnsupported);
        }
        let commands = pipeline.range(offset, count)?;
        logwise::trace_sync!(
            "replaying {count} indirect commands",
            count = commands.len()
        );
        for command in commands {
            self.queue.dispatch(
                Some(&mut self.imp),
                &command.kernel,
                command.global_size,
                command.local_size,
                command.args.clone(),
                false,
            )?;
        }
        Ok(())
    }

    /// Submits without waiting. Host recordings run here.
    pub fn submit(self) -> Result<(), ExecuteError> {
        match (self.imp, &self.queue.imp) {
            (RecordingImp::Explicit(recording), QueueImp::Explicit(queue)) => {
                queue.submit(recording)?;
                Ok(())
            }
            (RecordingImp::Host(recording), QueueImp::Host(_)) => recording.run(),
            _ => Err(ExecuteError::InvalidObject),
        }
    }

    /// Drops the recorded commands without running them.
    pub fn discard(self) {
        logwise::trace_sync!("discarding a command recording");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextConfig};
    use crate::kernel::{KernelDesc, KernelProgram};

    #[test]
    fn work_sizes_fill_missing_dimensions() {
        assert_eq!(7u32.to_3d(), [7, 1, 1]);
        assert_eq!([3, 2].to_3d(), [3, 2, 1]);
        assert_eq!([3, 2, 5].to_3d(), [3, 2, 5]);
    }

    #[test]
    fn cooperative_dispatch_needs_support() {
        let context = Context::with_config(&ContextConfig {
            cooperative_dispatch: false,
            ..ContextConfig::default()
        });
        let queue = context.create_queue(context.device()).unwrap();
        let kernel = context
            .create_kernel(KernelDesc::new("k"), KernelProgram::Binary(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(
            queue.execute_cooperative(&kernel, 64u32, 64u32, ()),
            Err(ExecuteError::CooperativeUnsupported)
        );
        queue.execute(&kernel, 64u32, 64u32, ()).unwrap();
    }

    #[test]
    fn discarded_recordings_never_run() {
        let context = Context::host();
        let queue = context.create_queue(context.device()).unwrap();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = ran.clone();
        let kernel = context
            .create_kernel(
                KernelDesc::new("k"),
                KernelProgram::host(move |_, _| {
                    flag.store(true, std::sync::atomic::Ordering::Relaxed)
                }),
            )
            .unwrap();
        let mut recording = queue.begin_recording().unwrap();
        recording.execute(&kernel, 1u32, 1u32, ()).unwrap();
        recording.discard();
        assert!(!ran.load(std::sync::atomic::Ordering::Relaxed));

        let mut recording = queue.begin_recording().unwrap();
        recording.execute(&kernel, 1u32, 1u32, ()).unwrap();
        assert!(!ran.load(std::sync::atomic::Ordering::Relaxed));
        recording.submit().unwrap();
        assert!(ran.load(std::sync::atomic::Ordering::Relaxed));
    }
}
