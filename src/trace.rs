//! In-memory trace model.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::latlon::LatLon;

/// Sentinel distance used until real inter-trace distances are computed, cm.
pub const UNKNOWN_PREV_DIST_CM: f64 = 100_000.0;

/// A local sample window `[from, to)` over a trace's full sample buffer.
///
/// Public accessors remap local indices by adding `from`, so downstream
/// code can operate on a trimmed view without copying the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    from: usize,
    to: usize,
}

impl SampleRange {
    pub fn new(from: usize, to: usize) -> Self {
        assert!(from <= to, "invalid sample range {from}..{to}");
        Self { from, to }
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }
}

/// Per-sample polarity edge classification codes. Zero means no edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EdgeKind {
    None = 0,
    /// Sign change '+' -> '-'.
    FallingZero = 1,
    /// Sign change '-' -> '+'.
    RisingZero = 2,
    /// Local extremum that was a minimum.
    LocalMin = 3,
    /// Local extremum that was a maximum.
    LocalMax = 4,
}

/// Number of distinct edge codes, including "no edge".
pub const NUM_EDGE_KINDS: usize = 5;

/// One recorded radar pulse response with its derived per-sample markers.
///
/// The raw header block is shared and immutable; sample, edge and good
/// buffers are owned and always have the full untrimmed length.
#[derive(Debug, Clone)]
pub struct Trace {
    bin_header: Arc<[u8]>,
    index: usize,
    sample_range: Option<SampleRange>,
    samples: Vec<f32>,
    edges: Vec<u8>,
    good: Vec<u8>,
    lat_lon: Option<LatLon>,
    lat_lon_origin: Option<LatLon>,
    timestamp: Option<DateTime<Utc>>,
    receiver_elevation: f32,
    marked: bool,
    /// Distance from the previous trace, cm.
    prev_dist_cm: f64,
    /// Index of the largest-magnitude sample, stored in global coordinates.
    max_index: usize,
}

impl Trace {
    pub fn new(
        bin_header: Arc<[u8]>,
        samples: Vec<f32>,
        lat_lon: Option<LatLon>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let len = samples.len();
        Self {
            bin_header,
            index: 0,
            sample_range: None,
            samples,
            edges: vec![0; len],
            good: vec![0; len],
            lat_lon,
            lat_lon_origin: lat_lon,
            timestamp,
            receiver_elevation: 0.0,
            marked: false,
            prev_dist_cm: UNKNOWN_PREV_DIST_CM,
            max_index: 0,
        }
    }

    /// Structural copy: samples, edges and good markers are cloned, the
    /// header block stays shared.
    pub fn copy(&self) -> Trace {
        self.clone()
    }

    pub fn bin_header(&self) -> &[u8] {
        &self.bin_header
    }

    pub fn shared_header(&self) -> Arc<[u8]> {
        Arc::clone(&self.bin_header)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn sample_range(&self) -> Option<SampleRange> {
        self.sample_range
    }

    pub fn set_sample_range(&mut self, range: Option<SampleRange>) {
        self.sample_range = range;
    }

    fn local_to_global(&self, index: usize) -> usize {
        match self.sample_range {
            Some(range) => index + range.from(),
            None => index,
        }
    }

    fn global_to_local(&self, index: usize) -> usize {
        match self.sample_range {
            Some(range) => index.saturating_sub(range.from()),
            None => index,
        }
    }

    /// Number of samples in the active window.
    pub fn num_samples(&self) -> usize {
        let total = self.samples.len();
        match self.sample_range {
            Some(range) => range.to().min(total) - range.from().min(total),
            None => total,
        }
    }

    /// Full untrimmed buffer length.
    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn sample(&self, index: usize) -> f32 {
        self.samples[self.local_to_global(index)]
    }

    pub fn set_sample(&mut self, index: usize, value: f32) {
        let i = self.local_to_global(index);
        self.samples[i] = value;
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn set_all_samples(&mut self, samples: Vec<f32>) {
        assert_eq!(samples.len(), self.samples.len());
        self.samples = samples;
    }

    pub fn edge(&self, index: usize) -> u8 {
        self.edges[self.local_to_global(index)]
    }

    pub fn set_edge(&mut self, index: usize, value: u8) {
        let i = self.local_to_global(index);
        self.edges[i] = value;
    }

    pub fn good(&self, index: usize) -> u8 {
        self.good[self.local_to_global(index)]
    }

    pub fn set_good(&mut self, index: usize, value: u8) {
        let i = self.local_to_global(index);
        self.good[i] = value;
    }

    /// Clear all edge and good markers, keeping buffer lengths.
    pub fn clear_markers(&mut self) {
        self.edges.fill(0);
        self.good.fill(0);
    }

    pub fn lat_lon(&self) -> Option<LatLon> {
        self.lat_lon
    }

    pub fn set_lat_lon(&mut self, lat_lon: Option<LatLon>) {
        self.lat_lon = lat_lon;
    }

    /// Position as decoded from the file, before any edits.
    pub fn lat_lon_origin(&self) -> Option<LatLon> {
        self.lat_lon_origin
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: Option<DateTime<Utc>>) {
        self.timestamp = timestamp;
    }

    pub fn receiver_elevation(&self) -> f32 {
        self.receiver_elevation
    }

    pub fn set_receiver_elevation(&mut self, elevation: f32) {
        self.receiver_elevation = elevation;
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn set_marked(&mut self, marked: bool) {
        self.marked = marked;
    }

    pub fn prev_dist_cm(&self) -> f64 {
        self.prev_dist_cm
    }

    pub fn set_prev_dist_cm(&mut self, dist: f64) {
        self.prev_dist_cm = dist;
    }

    /// Largest-magnitude sample index, in local coordinates.
    pub fn max_index(&self) -> usize {
        self.global_to_local(self.max_index)
    }

    pub fn set_max_index(&mut self, index: usize) {
        self.max_index = self.local_to_global(index);
    }
}

/// Deep-copy a trace list, reassigning indices from zero.
pub fn copy_traces(traces: &[Trace]) -> Vec<Trace> {
    traces
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut copy = t.copy();
            copy.set_index(i);
            copy
        })
        .collect()
}

/// Forward/backward-fill missing positions from the nearest known
/// neighbor. After the call no trace has a `None` position, provided at
/// least one trace had one before.
pub fn fill_missing_lat_lon(traces: &mut [Trace]) {
    let mut first_missing: Option<usize> = None;
    let mut last_known: Option<LatLon> = None;

    for i in 0..traces.len() {
        if traces[i].lat_lon().is_none() {
            if let Some(latlon) = last_known {
                traces[i].set_lat_lon(Some(latlon));
            } else if first_missing.is_none() {
                first_missing = Some(i);
            }
        }

        if let Some(latlon) = traces[i].lat_lon() {
            last_known = Some(latlon);

            if let Some(from) = first_missing.take() {
                for trace in &mut traces[from..i] {
                    trace.set_lat_lon(Some(latlon));
                }
            }
        }
    }
}
