//! Per-trace amplitude classification into a scan profile.

use crate::error::ProcessError;
use crate::file::GprFile;
use crate::process::{check_cancelled, Change, Command, ProgressSink};
use crate::profile::ScanProfile;
use crate::trace::Trace;

/// Depth window and gain settings for the classification. Explicit
/// parameters, no ambient display state.
#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    /// First sample of the classified depth window.
    pub layer: usize,
    /// Height of the classified depth window, samples.
    pub height: usize,
    /// Suppress amplitudes below `threshold` entirely.
    pub autogain: bool,
    pub threshold: f64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            layer: 0,
            height: usize::MAX,
            autogain: false,
            threshold: 0.0,
        }
    }
}

/// Scores every trace by its strongest edge-carrying amplitude inside the
/// depth window, against the per-depth background level of the file.
pub struct AmplitudeClassify {
    pub settings: ScanSettings,
}

impl AmplitudeClassify {
    pub fn new(settings: ScanSettings) -> Self {
        Self { settings }
    }
}

impl Default for AmplitudeClassify {
    fn default() -> Self {
        Self::new(ScanSettings::default())
    }
}

impl Command for AmplitudeClassify {
    fn name(&self) -> &str {
        "Amplitude scan"
    }

    fn change(&self) -> Change {
        Change::Redraw
    }

    fn run(
        &self,
        file: &mut GprFile,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProcessError> {
        let depth = file.max_samples();
        let (threshold, factor) = build_scale(file.traces(), depth);

        let start = self.settings.layer.min(depth);
        let finish = self.settings.layer.saturating_add(self.settings.height).min(depth);

        let mut scan = ScanProfile::new(file.num_traces());
        for (i, trace) in file.traces().iter().enumerate() {
            check_cancelled(progress)?;
            scan.intensity[i] =
                calc_alpha(trace, start, finish, &self.settings, &threshold, &factor);
        }
        file.set_ampl_scan(Some(scan));
        Ok(())
    }
}

/// Per-depth background threshold (mean magnitude) and normalization
/// factor across all traces.
fn build_scale(traces: &[Trace], depth: usize) -> (Vec<f64>, Vec<f64>) {
    let mut mean = vec![0.0f64; depth];
    let mut max = vec![0.0f64; depth];

    for trace in traces {
        let n = depth.min(trace.num_samples());
        for i in 0..n {
            let av = trace.sample(i).abs() as f64;
            mean[i] += av;
            if av > max[i] {
                max[i] = av;
            }
        }
    }

    let count = traces.len().max(1) as f64;
    let mut factor = vec![0.0f64; depth];
    for i in 0..depth {
        mean[i] /= count;
        let span = max[i] - mean[i];
        factor[i] = if span > 0.0 { 100.0 / span } else { 0.0 };
    }
    (mean, factor)
}

fn calc_alpha(
    trace: &Trace,
    start: usize,
    finish: usize,
    settings: &ScanSettings,
    threshold: &[f64],
    factor: &[f64],
) -> f64 {
    let start = start.min(trace.num_samples());
    let finish = finish.min(trace.num_samples());

    let additional_threshold = if settings.autogain {
        settings.threshold
    } else {
        0.0
    };

    let mut mx = 0.0f64;
    for i in start..finish {
        if trace.edge(i) == 0 {
            continue;
        }
        let mut av = trace.sample(i).abs() as f64;
        if av < additional_threshold {
            av = 0.0;
        }
        let val = (av - threshold[i]).max(0.0) * factor[i];
        if val > mx {
            mx = val;
        }
    }
    mx.clamp(0.0, 200.0)
}

#[cfg(test)]
mod test {
    use crate::process::edges::EdgeFind;
    use crate::process::NoProgress;
    use crate::test_util::synthetic_file;

    use super::*;

    #[test]
    fn test_anomalous_trace_scores_higher() {
        let mut file = synthetic_file(10, 30);
        // mild alternating background everywhere, one hot trace
        for trace in file.traces_mut() {
            for s in 0..30 {
                let sign = if s % 2 == 0 { 1.0 } else { -1.0 };
                trace.set_sample(s, sign);
            }
        }
        for s in 0..30 {
            let sign = if s % 2 == 0 { 1.0f32 } else { -1.0 };
            file.traces_mut()[5].set_sample(s, sign * 50.0);
        }

        EdgeFind.run(&mut file, &mut NoProgress).unwrap();
        AmplitudeClassify::default()
            .run(&mut file, &mut NoProgress)
            .unwrap();

        let scan = file.ampl_scan().unwrap();
        let hot = scan.intensity[5];
        let quiet = scan.intensity[2];
        assert!(hot > quiet, "hot {hot} quiet {quiet}");
    }

    #[test]
    fn test_intensity_clamped() {
        let mut file = synthetic_file(4, 10);
        for trace in file.traces_mut() {
            for s in 0..10 {
                trace.set_sample(s, if s % 2 == 0 { 1e6 } else { -1e6 });
            }
        }
        EdgeFind.run(&mut file, &mut NoProgress).unwrap();
        AmplitudeClassify::default()
            .run(&mut file, &mut NoProgress)
            .unwrap();
        for &v in &file.ampl_scan().unwrap().intensity {
            assert!((0.0..=200.0).contains(&v));
        }
    }
}
