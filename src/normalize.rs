//! Amplitude normalization applied on open and reversed before save.

/// Shifts samples around the survey-wide mean and scales them to a common
/// dynamic range. Only the bottom half of each trace contributes to the
/// mean because the top carries the direct-wave distortion.
#[derive(Debug, Clone, Copy)]
pub struct SampleNormalizer {
    avg: f32,
    reduce_factor: f32,
}

impl Default for SampleNormalizer {
    fn default() -> Self {
        Self {
            avg: 0.0,
            reduce_factor: 1.0,
        }
    }
}

use crate::trace::Trace;

impl SampleNormalizer {
    /// Map one normalized amplitude back to the file's raw scale.
    pub fn denormalized(&self, value: f32) -> f32 {
        value * self.reduce_factor + self.avg
    }

    pub fn normalize(&mut self, traces: &mut [Trace]) {
        if traces.is_empty() {
            return;
        }

        let mut sum = 0.0f64;
        let mut count = 0usize;
        for trace in traces.iter() {
            let n = trace.num_samples();
            for i in n / 2..n {
                sum += trace.sample(i) as f64;
                count += 1;
            }
        }
        if count == 0 {
            return;
        }
        self.avg = (sum / count as f64) as f32;

        let mut disp_sum = 0.0f64;
        let mut disp_count = 0usize;
        for trace in traces.iter() {
            for i in 0..trace.num_samples() {
                disp_sum += (trace.sample(i) - self.avg).abs() as f64;
                disp_count += 1;
            }
        }
        let dispersion = (disp_sum / disp_count as f64) as f32;

        self.reduce_factor = dispersion / 500.0;
        if self.reduce_factor == 0.0 {
            self.reduce_factor = 1.0;
        }

        log::debug!("normalize: avg {} dispersion {}", self.avg, dispersion);

        for trace in traces.iter_mut() {
            for i in 0..trace.num_samples() {
                let normalized = (trace.sample(i) - self.avg) / self.reduce_factor;
                trace.set_sample(i, normalized);
            }
        }
    }

    pub fn back(&self, traces: &mut [Trace]) {
        for trace in traces.iter_mut() {
            for i in 0..trace.num_samples() {
                let restored = self.denormalized(trace.sample(i));
                trace.set_sample(i, restored);
            }
        }
    }

    pub fn copy_from(&mut self, other: &SampleNormalizer) {
        *self = *other;
    }
}
