//! Removal of edges that belong to the ground-surface echo.
//!
//! The ground reflection paints long, spatially continuous runs of
//! same-type edges at a fixed offset from the ground profile. Real
//! subsurface features (hyperbolas) do not: their edges sit at a constant
//! depth only over a short lateral span. The filter slides a distance
//! window across the file and erases edge chains whose accumulated run
//! length is long enough to be surface clutter.

use std::collections::VecDeque;

use log::warn;

use crate::error::ProcessError;
use crate::file::GprFile;
use crate::process::{check_cancelled, Change, Command, ProgressSink};
use crate::profile::HorizontalProfile;
use crate::trace::{Trace, NUM_EDGE_KINDS};

/// Fraction of the evidence threshold that must be accumulated before a
/// run is marked as surface clutter. Tunable legacy constant.
pub const EVIDENCE_RATIO: f64 = 0.94;

/// Multiplier from the two-way travel distance at a depth to the minimum
/// run length that counts as evidence. Tunable legacy constant.
pub const GROUND_RUN_FACTOR: f64 = 4.0;

/// Shift sweep keeps this many samples away from the buffer edges.
const MARGIN: i32 = 5;

struct EdgeCoord {
    index: usize,
    smp: usize,
    dist: f64,
}

/// Sliding-window run accumulator for one edge type: a queue of
/// (trace, sample, distance) entries with a running distance sum, so the
/// "is the run long enough" question is O(1) per trace.
#[derive(Default)]
struct EdgeQueue {
    queue: VecDeque<EdgeCoord>,
    found_dist: f64,
    last_removed: Option<usize>,
}

impl EdgeQueue {
    fn push(&mut self, index: usize, smp: usize, dist: f64) {
        self.queue.push_back(EdgeCoord { index, smp, dist });
        self.found_dist += dist;
    }

    /// Mark every queued sample since the last marked run (or the window
    /// tail, whichever is later) once the accumulated run length clears
    /// the evidence bar.
    fn clear_group(&mut self, index: usize, min_dist: f64, tail_index: usize, traces: &mut [Trace]) {
        if self.found_dist > min_dist * EVIDENCE_RATIO {
            let remove_from = self
                .last_removed
                .map_or(tail_index, |last| (last + 1).max(tail_index));

            for ec in &self.queue {
                if ec.index >= remove_from {
                    traces[ec.index].set_good(ec.smp, 1);
                }
            }
            self.last_removed = Some(index);
        }
    }

    /// Drop entries that fell behind the trailing window boundary.
    fn evict(&mut self, tail_index: usize) {
        while let Some(front) = self.queue.front() {
            if front.index >= tail_index {
                break;
            }
            self.found_dist -= front.dist;
            self.queue.pop_front();
        }
    }
}

/// Erases ground-surface edge chains along three candidate profiles: a
/// straight line, the detected ground, and the ground doubled (the first
/// multiple echo).
pub struct EdgeGroundFilter;

impl Command for EdgeGroundFilter {
    fn name(&self) -> &str {
        "Filter edges"
    }

    fn change(&self) -> Change {
        Change::TraceValues
    }

    fn run(
        &self,
        file: &mut GprFile,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProcessError> {
        filter_ground_edges(file, progress)
    }
}

pub fn filter_ground_edges(
    file: &mut GprFile,
    progress: &mut dyn ProgressSink,
) -> Result<(), ProcessError> {
    let ground = match file.ground_profile() {
        Some(ground) => ground.clone(),
        None => {
            warn!("no ground profile on '{}', skipping edge filter", file.file_name());
            return Ok(());
        }
    };

    let mut flat = HorizontalProfile::new(file.num_traces());
    flat.finish();

    let candidates = [flat, ground.clone(), ground.doubled()];
    let max_samples = file.max_samples() as i32;
    let ground_avg = ground.avg_depth() as f64;

    let total_shifts: i64 = candidates
        .iter()
        .map(|hp| {
            let from = -hp.min_depth() + MARGIN;
            let to = max_samples - hp.max_depth() - MARGIN;
            (to - from).max(0) as i64
        })
        .sum();
    let mut done = 0i64;

    for hp in &candidates {
        let from = -hp.min_depth() + MARGIN;
        let to = max_samples - hp.max_depth() - MARGIN;

        for shift in from..to {
            check_cancelled(progress)?;

            // minimal run length that must follow the profile, cm
            let depth = (shift + hp.avg_depth()) as f64;
            let min_dist = travel_distance_cm(file, depth, ground_avg) * GROUND_RUN_FACTOR;

            process_shift(file.traces_mut(), hp, shift, min_dist);

            done += 1;
            if total_shifts > 0 && done % 32 == 0 {
                progress.progress_percent((done * 100 / total_shifts).min(100) as u8);
            }
        }
    }

    // erase everything marked as surface clutter
    for trace in file.traces_mut() {
        for smp in 0..trace.num_samples() {
            if trace.good(smp) != 0 {
                trace.set_edge(smp, 0);
            }
        }
    }
    Ok(())
}

/// Two-way vertical travel distance down to `depth`, cm; the air column
/// above the ground surface is priced at the vacuum velocity, the soil
/// below at the soil velocity.
fn travel_distance_cm(file: &GprFile, depth: f64, ground_depth: f64) -> f64 {
    let air = ground_depth.min(depth).max(0.0);
    let soil = (depth - air).max(0.0);
    file.samples_to_cm_air() * air + file.samples_to_cm_grn() * soil
}

fn process_shift(traces: &mut [Trace], hp: &HorizontalProfile, shift: i32, min_dist: f64) {
    let mut queues: [EdgeQueue; NUM_EDGE_KINDS] = Default::default();

    let mut current_tail = 0.0f64;
    let mut tail_index = 0usize;

    for i in 0..traces.len() {
        let prev_dist = traces[i].prev_dist_cm();
        current_tail += prev_dist;

        let smp = hp.depth(i) + shift;

        // the profile sample and one below it
        for r in 0..=1 {
            let real_smp = smp + r;
            if real_smp < 0 || real_smp as usize >= traces[i].num_samples() {
                continue;
            }
            let real_smp = real_smp as usize;
            let edge = traces[i].edge(real_smp) as usize;
            if edge < NUM_EDGE_KINDS {
                queues[edge].push(i, real_smp, prev_dist);
            }
        }

        for queue in queues.iter_mut().skip(1) {
            queue.clear_group(i, min_dist, tail_index, traces);
        }

        while current_tail > min_dist && tail_index < traces.len() {
            current_tail -= traces[tail_index].prev_dist_cm();
            for queue in queues.iter_mut().skip(1) {
                queue.evict(tail_index);
            }
            tail_index += 1;
        }
    }
}

#[cfg(test)]
mod test {
    use crate::process::NoProgress;
    use crate::test_util::synthetic_file;
    use crate::trace::EdgeKind;

    use super::*;

    // sample_interval 100 in the synthetic file gives 0.5 cm/sample in
    // soil; with a flat zero ground every depth is below ground, so a
    // line at depth d needs a run of d * 0.5 * 4.0 cm to be erased.

    fn file_with_flat_ground(num_traces: usize) -> GprFile {
        let mut file = synthetic_file(num_traces, 40);
        let mut ground = HorizontalProfile::new(num_traces);
        ground.finish();
        file.set_ground_profile(Some(ground));
        file
    }

    #[test]
    fn test_long_flat_run_is_erased() {
        // 40 traces, 5 cm apart: 200 cm of run at depth 10 vs a 20 cm
        // threshold
        let mut file = file_with_flat_ground(40);
        for trace in file.traces_mut() {
            trace.set_edge(10, EdgeKind::RisingZero as u8);
        }

        filter_ground_edges(&mut file, &mut NoProgress).unwrap();

        for trace in file.traces() {
            assert_eq!(trace.edge(10), 0, "trace {} kept its edge", trace.index());
        }
    }

    #[test]
    fn test_short_run_is_kept() {
        let mut file = file_with_flat_ground(40);
        // a 2-trace run: 10 cm, below every threshold in the sweep
        for trace in file.traces_mut().iter_mut().take(2) {
            trace.set_edge(30, EdgeKind::LocalMax as u8);
        }

        filter_ground_edges(&mut file, &mut NoProgress).unwrap();

        assert_eq!(file.traces()[0].edge(30), EdgeKind::LocalMax as u8);
        assert_eq!(file.traces()[1].edge(30), EdgeKind::LocalMax as u8);
    }

    #[test]
    fn test_no_ground_profile_is_noop() {
        let mut file = synthetic_file(10, 40);
        for trace in file.traces_mut() {
            trace.set_edge(10, EdgeKind::RisingZero as u8);
        }
        filter_ground_edges(&mut file, &mut NoProgress).unwrap();
        for trace in file.traces() {
            assert_eq!(trace.edge(10), EdgeKind::RisingZero as u8);
        }
    }

    #[test]
    fn test_cancellation_propagates() {
        struct Cancelled;
        impl crate::process::ProgressSink for Cancelled {
            fn is_cancelled(&self) -> bool {
                true
            }
        }

        let mut file = file_with_flat_ground(10);
        let err = filter_ground_edges(&mut file, &mut Cancelled).unwrap_err();
        assert!(err.is_cancelled());
    }
}
