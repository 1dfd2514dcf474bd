//! Constant background noise removal.

use crate::error::ProcessError;
use crate::file::GprFile;
use crate::process::{check_cancelled, Change, Command, FileSnapshot, ProgressSink, UndoModel};
use crate::trace::Trace;

/// Subtracts the depth-wise average trace from every trace.
///
/// Antenna ringing and the direct wave appear at the same depth in every
/// trace; averaging across the file isolates that constant component.
/// Destructive: a snapshot is pushed to the undo model before mutation.
pub struct RemoveBackground<'a> {
    undo: Option<&'a UndoModel>,
}

impl<'a> RemoveBackground<'a> {
    pub fn new(undo: &'a UndoModel) -> Self {
        Self { undo: Some(undo) }
    }

    pub fn without_undo() -> Self {
        Self { undo: None }
    }
}

impl Command for RemoveBackground<'_> {
    fn name(&self) -> &str {
        "Remove background"
    }

    fn change(&self) -> Change {
        Change::TraceValues
    }

    fn run(
        &self,
        file: &mut GprFile,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProcessError> {
        if let Some(undo) = self.undo {
            undo.push(FileSnapshot::take(file));
        }

        if file.num_traces() > 1 {
            let depth = file.max_samples();
            let profile = noise_profile(file.traces(), depth);
            check_cancelled(progress)?;
            subtract_profile(file.traces_mut(), &profile);
        }
        file.set_unsaved(true);
        Ok(())
    }
}

/// Remove constant noise from a bare trace list. The profile depth comes
/// from the second trace when there is one, which is enough for a quick
/// estimate.
pub fn remove_constant_noise(traces: &mut [Trace]) {
    if traces.is_empty() {
        return;
    }
    let depth_index = if traces.len() > 1 { 1 } else { 0 };
    let depth = traces[depth_index].num_samples();
    let profile = noise_profile(traces, depth);
    subtract_profile(traces, &profile);
}

/// Depth-wise mean amplitude over all traces. Traces shorter than the
/// requested depth contribute to the rows they have.
pub fn noise_profile(traces: &[Trace], depth: usize) -> Vec<f32> {
    let mut avg = vec![0.0f32; depth];
    for trace in traces {
        let n = avg.len().min(trace.num_samples());
        for (i, slot) in avg.iter_mut().take(n).enumerate() {
            *slot += trace.sample(i);
        }
    }
    let count = traces.len().max(1) as f32;
    for v in avg.iter_mut() {
        *v /= count;
    }
    avg
}

pub fn subtract_profile(traces: &mut [Trace], avg: &[f32]) {
    for trace in traces.iter_mut() {
        let n = avg.len().min(trace.num_samples());
        for (i, &a) in avg.iter().take(n).enumerate() {
            let value = trace.sample(i) - a;
            trace.set_sample(i, value);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;

    fn trace_of(samples: Vec<f32>) -> Trace {
        Trace::new(
            Arc::from(vec![0u8; 240].into_boxed_slice()),
            samples,
            None,
            None,
        )
    }

    #[test]
    fn test_average_is_zero_after_removal() {
        let mut traces = vec![
            trace_of(vec![1.0, 10.0, -3.0]),
            trace_of(vec![3.0, 14.0, -5.0]),
            trace_of(vec![2.0, 12.0, -4.0]),
        ];
        remove_constant_noise(&mut traces);

        for depth in 0..3 {
            let sum: f32 = traces.iter().map(|t| t.sample(depth)).sum();
            assert!(sum.abs() < 1e-5, "depth {depth} average {sum}");
        }
    }

    #[test]
    fn test_empty_list_is_noop() {
        let mut traces: Vec<Trace> = Vec::new();
        remove_constant_noise(&mut traces);
    }

    #[test]
    fn test_mismatched_lengths_truncate() {
        let mut traces = vec![trace_of(vec![4.0, 4.0, 4.0, 8.0]), trace_of(vec![4.0, 4.0])];
        remove_constant_noise(&mut traces);
        // rows beyond the shorter trace keep their residual from the
        // profile built over the traces that have them
        assert_eq!(traces[1].num_samples(), 2);
    }
}
