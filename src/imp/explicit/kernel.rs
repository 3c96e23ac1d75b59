// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Compiled kernels and their work-group size specializations.

use super::queue::ExplicitRecording;
use super::{BoundArgument, Driver, PipelineDesc, PipelineHandle, logged};
use crate::error::DriverError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Specialization key: 16 bits per work-group dimension.
pub(crate) fn specialization_key(local_size: [u32; 3]) -> u64 {
    (local_size[0] as u64 & 0xFFFF)
        | ((local_size[1] as u64 & 0xFFFF) << 16)
        | ((local_size[2] as u64 & 0xFFFF) << 32)
}

#[derive(Debug)]
pub(crate) struct ExplicitKernel {
    driver: Arc<dyn Driver>,
    entry: String,
    code: Vec<u8>,
    specializations: Mutex<HashMap<u64, PipelineHandle>>,
}

impl ExplicitKernel {
    pub(crate) fn new(driver: Arc<dyn Driver>, entry: String, code: Vec<u8>) -> Self {
        ExplicitKernel {
            driver,
            entry,
            code,
            specializations: Mutex::new(HashMap::new()),
        }
    }

    /// The pipeline specialized for `local_size`, created on first use.
    pub(crate) fn pipeline(&self, local_size: [u32; 3]) -> Result<PipelineHandle, DriverError> {
        let key = specialization_key(local_size);
        let mut specializations = self
            .specializations
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(pipeline) = specializations.get(&key) {
            return Ok(*pipeline);
        }
        logwise::info_sync!(
            "specializing kernel {entry} for work-group size {size}",
            entry = self.entry.clone(),
            size = logwise::privacy::LogIt(&local_size)
        );
        let pipeline = logged(
            self.driver.create_compute_pipeline(&PipelineDesc {
                entry: self.entry.clone(),
                code: self.code.clone(),
                local_size,
            }),
            "compute pipeline creation failed",
        )?;
        specializations.insert(key, pipeline);
        Ok(pipeline)
    }

    /// Records binding and dispatch. Arguments must already be in the state the kernel needs.
    pub(crate) fn record(
        &self,
        recording: &mut ExplicitRecording,
        local_size: [u32; 3],
        groups: [u32; 3],
        arguments: &[BoundArgument],
    ) -> Result<(), DriverError> {
        let pipeline = self.pipeline(local_size)?;
        let driver = recording.driver();
        let commands = recording.commands;
        logwise::trace_sync!(
            "dispatching {entry} over {groups} groups",
            entry = self.entry.clone(),
            groups = logwise::privacy::LogIt(&groups)
        );
        driver.cmd_bind_pipeline(commands, pipeline);
        driver.cmd_bind_arguments(commands, pipeline, arguments);
        driver.cmd_dispatch(commands, groups);
        Ok(())
    }
}

impl Drop for ExplicitKernel {
    fn drop(&mut self) {
        let specializations = self
            .specializations
            .get_mut()
            .unwrap_or_else(|e| e.into_inner());
        for (_, pipeline) in specializations.drain() {
            self.driver.destroy_pipeline(pipeline);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_pack_sixteen_bits_per_dimension() {
        assert_eq!(specialization_key([1, 1, 1]), 0x0000_0001_0001_0001);
        assert_eq!(specialization_key([256, 4, 2]), 0x0000_0002_0004_0100);
        assert_ne!(specialization_key([8, 8, 1]), specialization_key([64, 1, 1]));
    }
}
