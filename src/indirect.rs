// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Indirect command pipelines: dispatches recorded once and replayed by
[`crate::queue::Queue::execute_indirect`].

Commands are validated when they are added, so replaying only fails for reasons that depend on
the queue (a device without the kernel, or without indirect support).
*/

use crate::error::ExecuteError;
use crate::kernel::{ArgValue, Kernel, KernelArgs};
use crate::queue::WorkSize;
use std::sync::Arc;

/// Replays every command from the offset to the end.
pub const ALL_COMMANDS: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub(crate) struct IndirectCommand {
    pub(crate) kernel: Arc<Kernel>,
    pub(crate) global_size: [u32; 3],
    pub(crate) local_size: [u32; 3],
    pub(crate) args: Vec<ArgValue>,
}

#[derive(Debug, Clone, Default)]
pub struct IndirectCommandPipeline {
    commands: Vec<IndirectCommand>,
}

impl IndirectCommandPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a dispatch. Fails if `args` don't match the kernel, or `local_size` is zero or
    /// exceeds the kernel's limit.
    pub fn add_command<W: WorkSize, A: KernelArgs>(
        &mut self,
        kernel: &Arc<Kernel>,
        global_size: W,
        local_size: W,
        args: A,
    ) -> Result<(), ExecuteError> {
        let args = args.into_args();
        let local_size = local_size.to_3d();
        kernel.desc().validate_local_size(local_size, None)?;
        kernel.desc().validate_args(&args)?;
        self.commands.push(IndirectCommand {
            kernel: kernel.clone(),
            global_size: global_size.to_3d(),
            local_size,
            args,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The commands `offset..offset + count`, or `offset..` for [`ALL_COMMANDS`].
    pub(crate) fn range(&self, offset: u32, count: u32) -> Result<&[IndirectCommand], ExecuteError> {
        let len = self.commands.len();
        let out_of_range = ExecuteError::CommandRange {
            offset,
            count,
            len: len as u32,
        };
        let start = offset as usize;
        if start > len {
            return Err(out_of_range);
        }
        let end = if count == ALL_COMMANDS {
            len
        } else {
            start
                .checked_add(count as usize)
                .filter(|end| *end <= len)
                .ok_or(out_of_range)?
        };
        Ok(&self.commands[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::kernel::{ArgSpec, KernelDesc, KernelProgram};

    fn pipeline(commands: usize) -> IndirectCommandPipeline {
        let context = Context::host();
        let kernel = context
            .create_kernel(
                KernelDesc::new("k").arg(ArgSpec::scalar::<u32>()),
                KernelProgram::host(|_, _| {}),
            )
            .unwrap();
        let mut pipeline = IndirectCommandPipeline::new();
        for i in 0..commands {
            pipeline.add_command(&kernel, 4u32, 4u32, (i as u32,)).unwrap();
        }
        pipeline
    }

    #[test]
    fn ranges() {
        let pipeline = pipeline(4);
        assert_eq!(pipeline.range(0, ALL_COMMANDS).unwrap().len(), 4);
        assert_eq!(pipeline.range(1, 2).unwrap().len(), 2);
        assert_eq!(pipeline.range(4, ALL_COMMANDS).unwrap().len(), 0);
        assert_eq!(
            pipeline.range(3, 2).unwrap_err(),
            ExecuteError::CommandRange {
                offset: 3,
                count: 2,
                len: 4
            }
        );
        assert!(pipeline.range(5, ALL_COMMANDS).is_err());
    }

    #[test]
    fn commands_are_validated_when_added() {
        let context = Context::host();
        let kernel = context
            .create_kernel(
                KernelDesc::new("k").arg(ArgSpec::scalar::<u32>()),
                KernelProgram::host(|_, _| {}),
            )
            .unwrap();
        let mut pipeline = IndirectCommandPipeline::new();
        assert!(matches!(
            pipeline.add_command(&kernel, 4u32, 4u32, (1.0f64,)),
            Err(ExecuteError::ArgumentKind { index: 0, .. })
        ));
        assert_eq!(
            pipeline.add_command(&kernel, 4u32, 0u32, (1u32,)),
            Err(ExecuteError::ZeroLocalSize)
        );
        assert!(pipeline.is_empty());
    }
}
