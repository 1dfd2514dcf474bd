//! The trace processing pipeline: named operations over decoded files.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info};

use crate::error::ProcessError;
use crate::file::GprFile;

pub mod amplitude;
pub mod background;
pub mod distance;
pub mod edge_filter;
pub mod edges;
pub mod flatten;
pub mod ground;
pub mod level;

/// What a completed operation invalidated, so the caller knows which
/// downstream state to refresh. The pipeline itself is UI-agnostic and
/// only emits this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Trace sample or marker values were mutated.
    TraceValues,
    /// Nothing was mutated; a redraw is enough.
    Redraw,
    None,
}

/// Progress and cancellation interface supplied by the caller.
///
/// Cancellation is cooperative: operations poll `is_cancelled` once per
/// outer trace iteration and abort with [`ProcessError::Cancelled`],
/// never in the middle of a byte-level write.
pub trait ProgressSink {
    fn progress_percent(&mut self, _percent: u8) {}
    fn progress_msg(&mut self, _msg: &str) {}
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that swallows progress and never cancels.
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Shareable cancellation flag; pairs with any progress sink.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

pub(crate) fn check_cancelled(progress: &dyn ProgressSink) -> Result<(), ProcessError> {
    if progress.is_cancelled() {
        return Err(ProcessError::Cancelled);
    }
    Ok(())
}

/// A named, composable pipeline operation.
pub trait Command {
    fn name(&self) -> &str;

    fn change(&self) -> Change {
        Change::None
    }

    fn run(&self, file: &mut GprFile, progress: &mut dyn ProgressSink)
        -> Result<(), ProcessError>;
}

/// Apply one command to every file. A failure in one file is logged and
/// does not stop the batch; cancellation stops it immediately.
pub fn run_for_files(
    command: &dyn Command,
    files: &mut [GprFile],
    progress: &mut dyn ProgressSink,
) -> Result<Change, ProcessError> {
    let count = files.len();
    for (number, file) in files.iter_mut().enumerate() {
        progress.progress_msg(&format!(
            "process file '{}' ({}/{})",
            file.file_name(),
            number + 1,
            count
        ));

        match command.run(file, progress) {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => return Err(err),
            Err(err) => {
                error!("'{}' failed on '{}': {}", command.name(), file.file_name(), err);
                progress.progress_msg("error");
            }
        }
    }

    info!("finished '{}' over {} files", command.name(), count);
    progress.progress_msg(&format!("process finished '{}'", command.name()));
    Ok(command.change())
}

/// Undo support: sample/edge/good buffers deep-copied, headers and
/// geographic origin shared. Restoring swaps the trace list and the
/// ground profile back.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    traces: Vec<crate::trace::Trace>,
    ground_profile: Option<crate::profile::HorizontalProfile>,
}

impl FileSnapshot {
    pub fn take(file: &GprFile) -> Self {
        Self {
            traces: crate::trace::copy_traces(file.traces()),
            ground_profile: file.ground_profile().cloned(),
        }
    }

    pub fn restore(self, file: &mut GprFile) {
        file.set_traces(self.traces);
        file.set_ground_profile(self.ground_profile);
        file.set_unsaved(true);
    }
}

/// Stack of undo snapshots. Destructive commands push one frame before
/// mutating; single-threaded per invocation, like the rest of the
/// pipeline.
#[derive(Debug, Default)]
pub struct UndoModel {
    frames: std::cell::RefCell<Vec<FileSnapshot>>,
}

impl UndoModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, frame: FileSnapshot) {
        self.frames.borrow_mut().push(frame);
    }

    pub fn pop(&self) -> Option<FileSnapshot> {
        self.frames.borrow_mut().pop()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Failing;

    impl Command for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn run(
            &self,
            _file: &mut GprFile,
            _progress: &mut dyn ProgressSink,
        ) -> Result<(), ProcessError> {
            Err(ProcessError::Other("boom".into()))
        }
    }

    struct CancelSink;

    impl ProgressSink for CancelSink {
        fn is_cancelled(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        let shared = flag.clone();
        shared.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_check_cancelled_reports_control_flow() {
        let err = check_cancelled(&CancelSink).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let mut files = [crate::test_util::synthetic_file(3, 16)];
        let change = run_for_files(&Failing, &mut files, &mut NoProgress).unwrap();
        assert_eq!(change, Change::None);
    }
}
