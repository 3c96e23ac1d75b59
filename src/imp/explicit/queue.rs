// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Explicit queues, command recordings and the recorder used by every state transition.

use super::{CommandsHandle, Driver, FenceHandle, QueueHandle, logged};
use crate::error::DriverError;
use crate::kernel::{ArgValue, Kernel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

#[derive(Debug)]
struct Submission {
    commands: CommandsHandle,
    fence: FenceHandle,
    //kept alive until the fence signals
    retained: Vec<ArgValue>,
    kernels: Vec<Arc<Kernel>>,
}

#[derive(Debug)]
pub(crate) struct ExplicitQueue {
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) handle: QueueHandle,
    pub(crate) family: u32,
    pending: Mutex<Vec<Submission>>,
    profiling: Mutex<Option<Instant>>,
}

impl ExplicitQueue {
    pub(crate) fn new(driver: Arc<dyn Driver>, family: u32) -> Result<Self, DriverError> {
        let handle = logged(driver.get_queue(family, 0), "queue retrieval failed")?;
        Ok(ExplicitQueue {
            driver,
            handle,
            family,
            pending: Mutex::new(Vec::new()),
            profiling: Mutex::new(None),
        })
    }

    pub(crate) fn begin(&self) -> Result<ExplicitRecording, DriverError> {
        let commands = logged(
            self.driver.begin_commands(self.handle),
            "command recording creation failed",
        )?;
        Ok(ExplicitRecording {
            driver: self.driver.clone(),
            commands,
            retained: Vec::new(),
            kernels: Vec::new(),
            finished: false,
        })
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Submission>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Submits without waiting. Retained arguments live until the work completes.
    pub(crate) fn submit(&self, mut recording: ExplicitRecording) -> Result<(), DriverError> {
        recording.finished = true;
        let fence = match logged(self.driver.submit(recording.commands), "submission failed") {
            Ok(fence) => fence,
            Err(e) => {
                self.driver.free_commands(recording.commands);
                return Err(e);
            }
        };
        self.pending().push(Submission {
            commands: recording.commands,
            fence,
            retained: std::mem::take(&mut recording.retained),
            kernels: std::mem::take(&mut recording.kernels),
        });
        Ok(())
    }

    /// Submits and blocks until the recording completed.
    pub(crate) fn submit_and_wait(&self, mut recording: ExplicitRecording) -> Result<(), DriverError> {
        recording.finished = true;
        let result = logged(self.driver.submit(recording.commands), "submission failed")
            .and_then(|fence| logged(self.driver.wait(fence), "fence wait failed"));
        self.driver.free_commands(recording.commands);
        result
    }

    /// Blocks until all submitted work has completed.
    pub(crate) fn finish(&self) -> Result<(), DriverError> {
        let submissions = std::mem::take(&mut *self.pending());
        let mut result = Ok(());
        for submission in submissions {
            if let Err(e) = logged(self.driver.wait(submission.fence), "fence wait failed") {
                result = Err(e);
            }
            self.driver.free_commands(submission.commands);
        }
        result
    }

    /// Releases completed submissions.
    pub(crate) fn flush(&self) {
        let mut pending = self.pending();
        let driver = &self.driver;
        pending.retain(|submission| {
            if driver.fence_signaled(submission.fence) {
                driver.free_commands(submission.commands);
                false
            } else {
                true
            }
        });
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending().len()
    }

    pub(crate) fn start_profiling(&self) {
        *self.profiling.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    pub(crate) fn stop_profiling(&self) -> Result<u64, DriverError> {
        self.finish()?;
        let start = self
            .profiling
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        Ok(start.map_or(0, |start| start.elapsed().as_micros() as u64))
    }
}

impl Drop for ExplicitQueue {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            logwise::error_sync!(
                "queue teardown could not wait for outstanding work: {err}",
                err = logwise::privacy::LogIt(&e)
            );
        }
    }
}

/// A command recording that has not been submitted yet.
///
/// Dropping it without submitting discards the recorded commands.
#[derive(Debug)]
pub(crate) struct ExplicitRecording {
    driver: Arc<dyn Driver>,
    pub(crate) commands: CommandsHandle,
    retained: Vec<ArgValue>,
    kernels: Vec<Arc<Kernel>>,
    finished: bool,
}

impl ExplicitRecording {
    pub(crate) fn retain(&mut self, kernel: &Arc<Kernel>, args: impl IntoIterator<Item = ArgValue>) {
        if !self.kernels.iter().any(|k| Arc::ptr_eq(k, kernel)) {
            self.kernels.push(kernel.clone());
        }
        self.retained.extend(args);
    }
    pub(crate) fn driver(&self) -> &dyn Driver {
        &*self.driver
    }
}

impl Drop for ExplicitRecording {
    fn drop(&mut self) {
        if !self.finished {
            self.driver.free_commands(self.commands);
        }
    }
}

/**
Where a state transition or transfer records its commands.

`Immediate` records into a disposable recording, submits it and blocks until it completed.
`Deferred` records into a caller-supplied recording; the commands take effect when that recording
is submitted.
*/
pub(crate) enum Recorder<'a> {
    Immediate(&'a ExplicitQueue),
    Deferred(&'a mut ExplicitRecording),
}

impl Recorder<'_> {
    pub(crate) fn record<R>(
        &mut self,
        f: impl FnOnce(&dyn Driver, CommandsHandle) -> R,
    ) -> Result<R, DriverError> {
        match self {
            Recorder::Immediate(queue) => {
                let _interval = logwise::perfwarn_begin!("blocking command recording");
                let recording = queue.begin()?;
                let r = f(recording.driver(), recording.commands);
                queue.submit_and_wait(recording)?;
                Ok(r)
            }
            Recorder::Deferred(recording) => Ok(f(recording.driver(), recording.commands)),
        }
    }
}
