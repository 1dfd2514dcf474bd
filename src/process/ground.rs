//! Ground-surface detection strategies.
//!
//! Two interchangeable detectors produce the per-trace ground profile: an
//! amplitude-contrast scorer and an edge-cohesion line tracker. Both work
//! on a noise-removed working copy so the direct wave does not dominate.

use log::debug;

use crate::file::GprFile;
use crate::process::background::remove_constant_noise;
use crate::process::edges::scan_trace;
use crate::profile::HorizontalProfile;
use crate::trace::Trace;

/// Strategy interface: one profile per file, or none when the data gives
/// no usable surface.
pub trait GroundDetector {
    fn name(&self) -> &str;

    fn detect(&self, file: &GprFile) -> Option<HorizontalProfile>;
}

/// Amplitude-based detector.
///
/// Builds the trace-by-sample amplitude picture after background removal
/// and picks, per trace, the depth with the strongest contrast between the
/// quiet air column above and the cluttered soil below.
pub struct AmplitudeMatrix {
    /// Scoring window on each side of the candidate depth, samples.
    pub window: usize,
}

impl Default for AmplitudeMatrix {
    fn default() -> Self {
        Self { window: 5 }
    }
}

impl GroundDetector for AmplitudeMatrix {
    fn name(&self) -> &str {
        "amplitude matrix"
    }

    fn detect(&self, file: &GprFile) -> Option<HorizontalProfile> {
        let mut working = file.copy();
        remove_constant_noise(working.traces_mut());

        let num_traces = working.num_traces();
        if num_traces == 0 {
            return None;
        }

        let mut hp = HorizontalProfile::new(num_traces);
        for (i, trace) in working.traces().iter().enumerate() {
            hp.set_depth(i, self.best_depth(trace));
        }
        hp.finish();

        debug!("amplitude ground: avg depth {}", hp.avg_depth());
        Some(hp)
    }
}

impl AmplitudeMatrix {
    /// Depth whose below-window mean magnitude most exceeds its
    /// above-window mean magnitude.
    fn best_depth(&self, trace: &Trace) -> i32 {
        let n = trace.num_samples();
        let w = self.window;
        if n < 2 * w + 1 {
            return 0;
        }

        // prefix sums of |amplitude| for O(1) window means
        let mut prefix = vec![0.0f64; n + 1];
        for i in 0..n {
            prefix[i + 1] = prefix[i] + trace.sample(i).abs() as f64;
        }
        let window_mean =
            |from: usize, to: usize| (prefix[to] - prefix[from]) / (to - from) as f64;

        let mut best = w;
        let mut best_score = f64::MIN;
        for d in w..n - w {
            let above = window_mean(d - w, d);
            let below = window_mean(d, d + w);
            let score = below - above;
            if score > best_score {
                best_score = score;
                best = d;
            }
        }
        best as i32
    }
}

/// Neighborhood search order around the previous trace's matched depth.
const LOOKING_ORDER: [i32; 5] = [0, -1, 1, -2, 2];

/// Maximum run of consecutive unmatched traces before a line is abandoned.
const MAX_CONSECUTIVE_MISSES: usize = 6;

/// Edge-cohesion detector.
///
/// Starts a candidate line at every first-trace sample carrying an edge
/// and walks it across the file, re-finding the same edge code in a small
/// neighborhood of the previous depth. Candidates that miss too often are
/// abandoned; of the curved survivors the brightest one is the ground.
pub struct CohesiveScan;

impl GroundDetector for CohesiveScan {
    fn name(&self) -> &str {
        "cohesive scan"
    }

    fn detect(&self, file: &GprFile) -> Option<HorizontalProfile> {
        let mut working = file.copy();
        remove_constant_noise(working.traces_mut());
        for trace in working.traces_mut() {
            trace.clear_markers();
            scan_trace(trace);
        }

        let lines = scan_lines(working.traces(), working.max_samples());
        debug!("cohesive ground: {} candidate lines", lines.len());

        // straight lines are antenna artifacts; the ground undulates
        let curved: Vec<HorizontalProfile> =
            lines.into_iter().filter(|hp| hp.height() > 4).collect();

        brightest(curved, working.traces())
    }
}

/// Track every candidate line across the trace list.
pub fn scan_lines(traces: &[Trace], max_samples: usize) -> Vec<HorizontalProfile> {
    let mut result = Vec::new();
    let first = match traces.first() {
        Some(first) => first,
        None => return result,
    };

    for start_smp in 4..max_samples.saturating_sub(4) {
        if first.edge(start_smp) == 0 {
            continue;
        }

        let example = first.edge(start_smp);
        let mut last_smp = start_smp;

        let mut hp = HorizontalProfile::new(traces.len());
        let mut miss_count = 0usize;
        let mut all_miss_count = 0usize;
        let mut abandoned = false;

        for (index, trace) in traces.iter().enumerate() {
            match find_example_around(example, last_smp, trace) {
                None => {
                    hp.set_depth(index, last_smp as i32);
                    miss_count += 1;
                    all_miss_count += 1;
                }
                Some(found) => {
                    hp.set_depth(index, found as i32);
                    miss_count = 0;
                    last_smp = found;
                }
            }

            // tolerance grows with the distance already covered
            if miss_count > MAX_CONSECUTIVE_MISSES || all_miss_count > index / 3 + 10 {
                abandoned = true;
                break;
            }
        }

        if !abandoned {
            hp.finish();
            result.push(hp);
        }
    }
    result
}

fn find_example_around(example: u8, last_smp: usize, trace: &Trace) -> Option<usize> {
    let max = trace.num_samples().saturating_sub(1);
    for offset in LOOKING_ORDER {
        let smp = last_smp as i32 + offset;
        if smp >= 0 && (smp as usize) < max && trace.edge(smp as usize) == example {
            return Some(smp as usize);
        }
    }
    None
}

/// Line with the greatest summed magnitude along its depths.
fn brightest(lines: Vec<HorizontalProfile>, traces: &[Trace]) -> Option<HorizontalProfile> {
    lines
        .into_iter()
        .map(|hp| {
            let brightness: f64 = traces
                .iter()
                .enumerate()
                .map(|(i, trace)| {
                    let depth = hp.depth(i).max(0) as usize;
                    if depth < trace.num_samples() {
                        trace.sample(depth).abs() as f64
                    } else {
                        0.0
                    }
                })
                .sum();
            (brightness, hp)
        })
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, hp)| hp)
}
