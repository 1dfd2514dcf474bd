//! Horizontal depth profiles: one depth value per trace.

/// Smoothing window radius, traces.
const SMOOTHING_WINDOW: i32 = 7;

/// Per-trace ground-surface depth in sample units, smoothed on `finish()`.
///
/// Built empty, populated by a detector, then finished once; subsequent
/// min/max/avg reads are O(1). The `offset` shifts the whole profile
/// horizontally at read time.
#[derive(Debug, Clone, Default)]
pub struct HorizontalProfile {
    offset: i32,
    depths: Vec<i32>,
    min_depth: i32,
    max_depth: i32,
    avg_depth: i32,
}

impl HorizontalProfile {
    pub fn new(size: usize) -> Self {
        Self {
            depths: vec![0; size],
            ..Default::default()
        }
    }

    pub fn from_depths(depths: Vec<i32>) -> Self {
        Self {
            depths,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    pub fn depth(&self, index: usize) -> i32 {
        let i = index as i32 - self.offset;
        if i >= 0 && (i as usize) < self.depths.len() {
            self.depths[i as usize]
        } else {
            0
        }
    }

    pub fn set_depth(&mut self, index: usize, depth: i32) {
        let i = index as i32 - self.offset;
        if i >= 0 && (i as usize) < self.depths.len() {
            self.depths[i as usize] = depth;
        }
    }

    pub fn min_depth(&self) -> i32 {
        self.min_depth
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    pub fn avg_depth(&self) -> i32 {
        self.avg_depth
    }

    /// Depth span of the profile. A nearly flat profile has a small height.
    pub fn height(&self) -> i32 {
        self.max_depth - self.min_depth
    }

    /// Smooth and compute the derived min/max/avg depths. Call once after
    /// the profile is fully populated.
    pub fn finish(&mut self) {
        self.smooth();

        let mut min = self.depths.first().copied().unwrap_or(0);
        let mut max = min;
        let mut sum: i64 = 0;
        for &depth in &self.depths {
            min = min.min(depth);
            max = max.max(depth);
            sum += depth as i64;
        }
        self.min_depth = min;
        self.max_depth = max;
        self.avg_depth = if self.depths.is_empty() {
            0
        } else {
            (sum / self.depths.len() as i64) as i32
        };
    }

    /// Synthetic search profile at twice the depth, used to hunt for the
    /// first-multiple ground echo.
    pub fn doubled(&self) -> HorizontalProfile {
        let mut hp =
            HorizontalProfile::from_depths(self.depths.iter().map(|d| d * 2).collect());
        hp.finish();
        hp
    }

    /// Weighted moving average over a symmetric window. The weight
    /// `k²(1−k)²` of the normalized offset suppresses noise while keeping
    /// curvature better than a flat average.
    fn smooth(&mut self) {
        let n = self.depths.len();
        let mut result = vec![0i32; n];
        for (i, slot) in result.iter_mut().enumerate() {
            *slot = self.weighted_average_at(i);
        }
        self.depths = result;
    }

    fn weighted_average_at(&self, i: usize) -> i32 {
        let r = SMOOTHING_WINDOW;
        let i = i as i32;
        let last = self.depths.len() as i32 - 1;

        let from = (i - r).max(0);
        let to = (i + r).min(last);

        let mut sum = 0.0;
        let mut cnt = 0.0;
        for j in from..=to {
            let kfx = (r + j - i) as f64 / (r * 2) as f64;
            let kf = kfx * kfx * (1.0 - kfx) * (1.0 - kfx);
            sum += self.depths[j as usize] as f64 * kf;
            cnt += kf;
        }
        (sum / cnt).round() as i32
    }
}

/// Per-trace amplitude intensity produced by the algorithmic scan.
#[derive(Debug, Clone, Default)]
pub struct ScanProfile {
    pub intensity: Vec<f64>,
}

impl ScanProfile {
    pub fn new(size: usize) -> Self {
        Self {
            intensity: vec![0.0; size],
        }
    }
}
