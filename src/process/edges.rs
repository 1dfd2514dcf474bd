//! Per-trace polarity edge classification.

use crate::error::ProcessError;
use crate::file::GprFile;
use crate::process::{check_cancelled, Change, Command, ProgressSink};
use crate::trace::{EdgeKind, Trace};

/// Scans every trace for sign changes and local extrema.
///
/// A sign change at sample `s` marks `edge[s]` with [`EdgeKind::FallingZero`]
/// or [`EdgeKind::RisingZero`]. Independently the index of the
/// largest-magnitude sample since the previous sign change is tracked; when
/// the next change occurs that extremum is marked [`EdgeKind::LocalMin`] or
/// [`EdgeKind::LocalMax`] by its sign. Zero amplitude keeps its own sign
/// class, distinct from both polarities.
pub struct EdgeFind;

impl Command for EdgeFind {
    fn name(&self) -> &str {
        "Scan for edges"
    }

    fn change(&self) -> Change {
        Change::TraceValues
    }

    fn run(
        &self,
        file: &mut GprFile,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProcessError> {
        for trace in file.traces_mut() {
            check_cancelled(progress)?;
            scan_trace(trace);
        }
        Ok(())
    }
}

fn sign(value: f32) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

pub fn scan_trace(trace: &mut Trace) {
    let mut mxind = 0usize;
    let mut global_max = 0usize;
    for s in 1..trace.num_samples() {
        let s1 = sign(trace.sample(s - 1));
        let s2 = sign(trace.sample(s));

        if s1 != s2 {
            trace.set_edge(
                s,
                if s1 > s2 {
                    EdgeKind::FallingZero as u8
                } else {
                    EdgeKind::RisingZero as u8
                },
            );
            trace.set_edge(
                mxind,
                if trace.sample(mxind) < 0.0 {
                    EdgeKind::LocalMin as u8
                } else {
                    EdgeKind::LocalMax as u8
                },
            );
            mxind = s;
        }

        if trace.sample(mxind).abs() < trace.sample(s).abs() {
            mxind = s;
        }
        if trace.sample(global_max).abs() < trace.sample(s).abs() {
            global_max = s;
        }
    }
    trace.set_max_index(global_max);
}
