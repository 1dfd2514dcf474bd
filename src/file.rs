//! Opening, saving and copying a GPR survey file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use log::debug;

use crate::binfile::{BinFile, BinTrace};
use crate::error::{FormatError, SaveError};
use crate::header::{BinaryHeader, TraceHeader};
use crate::latlon::{ddmm_from_degrees, degrees_from_ddmm, LatLon};
use crate::meta::{MetaFile, TraceLine};
use crate::normalize::SampleNormalizer;
use crate::profile::{HorizontalProfile, ScanProfile};
use crate::samples::{bytes_to_samples, samples_to_bytes, SampleCode};
use crate::trace::{copy_traces, fill_missing_lat_lon, Trace};

/// Radar pulse velocity in vacuum, cm/ns.
pub const SPEED_CM_NS_VACUUM: f64 = 30.0;
/// Radar pulse velocity in soil, cm/ns.
pub const SPEED_CM_NS_SOIL: f64 = SPEED_CM_NS_VACUUM / 3.0;

const METERS_PER_FOOT: f64 = 0.3048;

/// Measurement system code meaning feet.
const MEASUREMENT_FEET: i16 = 2;

/// Capability set shared by survey file kinds. The processing pipeline
/// only needs the GPR variant; the seam keeps other kinds (sonar, CSV
/// logs) pluggable without widening the pipeline's surface.
pub trait SurveyFile: Sized {
    fn open(path: &Path) -> Result<Self, FormatError>;

    fn save(&self, path: &Path) -> Result<(), SaveError>;

    fn copy(&self) -> Self;

    fn num_traces(&self) -> usize;

    /// Sample interval in microseconds.
    fn sample_interval(&self) -> i16;
}

/// A decoded survey file: preserved raw headers plus the owned trace list.
///
/// The trace list is exclusively owned by this object; processing stages
/// mutate traces in place, and [`GprFile::copy`] produces an independent
/// working copy for non-destructive pipelines.
#[derive(Debug, Clone)]
pub struct GprFile {
    path: PathBuf,
    txt_hdr: Vec<u8>,
    bin_hdr: Vec<u8>,
    binary_header: BinaryHeader,
    sample_code: SampleCode,
    normalizer: SampleNormalizer,
    traces: Vec<Trace>,
    meta: MetaFile,
    ground_profile: Option<HorizontalProfile>,
    ampl_scan: Option<ScanProfile>,
    unsaved: bool,
}

impl GprFile {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let bin_file = BinFile::load(path)?;
        Self::from_bin_file(bin_file, path)
    }

    pub fn from_bin_file(bin_file: BinFile, path: &Path) -> Result<Self, FormatError> {
        let binary_header = BinaryHeader::decode(&bin_file.bin_hdr)?;
        let sample_code = SampleCode::from_header(binary_header.data_sample_code)?;

        debug!(
            "sample interval {} us, {} samples per trace",
            binary_header.sample_interval, binary_header.samples_per_trace
        );

        let mut traces = Vec::with_capacity(bin_file.traces.len());
        for bin_trace in &bin_file.traces {
            let trace = read_trace(bin_trace, sample_code, &binary_header)?;
            traces.push(trace);
        }

        fill_missing_lat_lon(&mut traces);

        // sidecar: load if present, otherwise derive the initial state
        let meta_path = MetaFile::meta_path(path);
        let meta = if meta_path.exists() {
            MetaFile::load(&meta_path)?
        } else {
            init_meta(&traces)
        };
        for trace in traces.iter_mut() {
            trace.set_sample_range(meta.sample_range());
        }

        let mut file = Self {
            path: path.to_path_buf(),
            txt_hdr: bin_file.txt_hdr,
            bin_hdr: bin_file.bin_hdr,
            binary_header,
            sample_code,
            normalizer: SampleNormalizer::default(),
            traces,
            meta,
            ground_profile: None,
            ampl_scan: None,
            unsaved: false,
        };
        file.update_trace_indices();
        crate::process::distance::calc_distances(&mut file.traces);
        crate::process::distance::smooth_distances(&mut file.traces);

        debug!(
            "opened '{}': {} traces",
            path.display(),
            file.traces.len()
        );
        Ok(file)
    }

    /// Save the full file. Headers round-trip byte-for-byte except the
    /// documented patched fields; samples are written as they currently
    /// are, so a normalized file should be denormalized first.
    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        let num_samples = self.max_samples() as i16;

        let mut bin_hdr = self.bin_hdr.clone();
        if num_samples != self.binary_header.samples_per_trace {
            BinaryHeader::patch_samples_per_trace(&mut bin_hdr, num_samples);
        }

        let marks = self.meta.marks();

        let mut bin_traces = Vec::with_capacity(self.traces.len());
        for trace in &self.traces {
            bin_traces.push(self.encode_trace(trace, marks)?);
        }

        let bin_file = BinFile {
            txt_hdr: self.txt_hdr.clone(),
            bin_hdr,
            traces: bin_traces,
        };
        bin_file.save(path)?;

        let mut meta = self.meta.clone();
        meta.set_sample_range(max_sample_range(&self.traces));
        meta.save(&MetaFile::meta_path(path))
            .map_err(|source| SaveError::Write {
                path: MetaFile::meta_path(path),
                source,
            })?;
        Ok(())
    }

    /// Patch only the fields whose value actually changed, so an
    /// untouched trace round-trips its header byte-for-byte.
    fn encode_trace(&self, trace: &Trace, marks: &BTreeSet<usize>) -> Result<BinTrace, SaveError> {
        let mut header = trace.bin_header().to_vec();
        let orig = TraceHeader::decode(&header).map_err(SaveError::Format)?;

        if trace.num_samples() as i16 != orig.num_samples {
            TraceHeader::patch_num_samples(&mut header, trace.num_samples() as i16);
        }

        if let Some(latlon) = trace.lat_lon() {
            if trace.lat_lon() != trace.lat_lon_origin() {
                TraceHeader::patch_position(
                    &mut header,
                    ddmm_from_degrees(latlon.lon()),
                    ddmm_from_degrees(latlon.lat()),
                );
            }
        }

        let mut elevation = trace.receiver_elevation();
        if self.binary_header.measurement_system == MEASUREMENT_FEET {
            elevation = (elevation as f64 / METERS_PER_FOOT) as f32;
        }
        if elevation.to_bits() != orig.receiver_elevation.to_bits() {
            TraceHeader::patch_receiver_elevation(&mut header, elevation);
        }

        let marked = marks.contains(&trace.index());
        if marked != orig.marked {
            TraceHeader::patch_mark(&mut header, marked);
        }

        // active window only
        let values: Vec<f32> = (0..trace.num_samples()).map(|i| trace.sample(i)).collect();
        let data = samples_to_bytes(&values, self.sample_code)?;

        Ok(BinTrace { header, data })
    }

    /// Independent working copy. Immutable header blocks are shared;
    /// sample, edge and good buffers are cloned. The ground profile is
    /// not copied.
    pub fn copy(&self) -> GprFile {
        let mut copy = self.clone();
        copy.traces = copy_traces(&self.traces);
        copy.ground_profile = None;
        copy.ampl_scan = None;
        copy
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn num_traces(&self) -> usize {
        self.traces.len()
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn traces_mut(&mut self) -> &mut [Trace] {
        &mut self.traces
    }

    pub fn set_traces(&mut self, traces: Vec<Trace>) {
        self.traces = traces;
        self.update_trace_indices();
    }

    pub fn update_trace_indices(&mut self) {
        for (i, trace) in self.traces.iter_mut().enumerate() {
            trace.set_index(i);
        }
    }

    /// Active sample count, taken from the first trace.
    pub fn max_samples(&self) -> usize {
        self.traces.first().map_or(0, Trace::num_samples)
    }

    /// Sample interval in microseconds.
    pub fn sample_interval(&self) -> i16 {
        self.binary_header.sample_interval
    }

    pub fn binary_header(&self) -> &BinaryHeader {
        &self.binary_header
    }

    pub fn sample_code(&self) -> SampleCode {
        self.sample_code
    }

    /// Distance between two adjacent samples below ground, cm.
    pub fn samples_to_cm_grn(&self) -> f64 {
        let sample_interval_ns = self.binary_header.sample_interval as f64 / 1000.0;
        SPEED_CM_NS_SOIL * sample_interval_ns / 2.0
    }

    /// Distance between two adjacent samples above ground, cm.
    pub fn samples_to_cm_air(&self) -> f64 {
        let sample_interval_ns = self.binary_header.sample_interval as f64 / 1000.0;
        SPEED_CM_NS_VACUUM * sample_interval_ns / 2.0
    }

    pub fn samples_per_meter(&self) -> f64 {
        100.0 / self.samples_to_cm_air()
    }

    /// Vertical distance between two sample depths of one trace, cm.
    /// Samples above the ground surface are priced at the air velocity,
    /// samples below at the soil velocity.
    pub fn vertical_distance_cm(&self, trace_index: usize, smp1: f64, smp2: f64) -> f64 {
        let ground = self
            .ground_profile
            .as_ref()
            .map_or(0.0, |hp| hp.depth(trace_index) as f64);

        let h1 = smp1.min(smp2);
        let h2 = smp1.max(smp2);

        let air = (ground.min(h2) - h1).max(0.0);
        let soil = h2 - h1 - air;

        self.samples_to_cm_air() * air + self.samples_to_cm_grn() * soil
    }

    pub fn ground_profile(&self) -> Option<&HorizontalProfile> {
        self.ground_profile.as_ref()
    }

    pub fn set_ground_profile(&mut self, profile: Option<HorizontalProfile>) {
        self.ground_profile = profile;
    }

    pub fn ampl_scan(&self) -> Option<&ScanProfile> {
        self.ampl_scan.as_ref()
    }

    pub fn set_ampl_scan(&mut self, scan: Option<ScanProfile>) {
        self.ampl_scan = scan;
    }

    pub fn meta(&self) -> &MetaFile {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut MetaFile {
        &mut self.meta
    }

    pub fn is_unsaved(&self) -> bool {
        self.unsaved
    }

    pub fn set_unsaved(&mut self, unsaved: bool) {
        self.unsaved = unsaved;
    }

    pub fn normalizer(&self) -> &SampleNormalizer {
        &self.normalizer
    }

    /// Scale samples into the common working range. The factors stay with
    /// the file so [`GprFile::denormalize`] can restore raw amplitudes.
    pub fn normalize(&mut self) {
        self.normalizer.normalize(&mut self.traces);
    }

    pub fn denormalize(&mut self) {
        self.normalizer.back(&mut self.traces);
    }
}

impl SurveyFile for GprFile {
    fn open(path: &Path) -> Result<Self, FormatError> {
        GprFile::open(path)
    }

    fn save(&self, path: &Path) -> Result<(), SaveError> {
        GprFile::save(self, path)
    }

    fn copy(&self) -> Self {
        GprFile::copy(self)
    }

    fn num_traces(&self) -> usize {
        GprFile::num_traces(self)
    }

    fn sample_interval(&self) -> i16 {
        GprFile::sample_interval(self)
    }
}

fn init_meta(traces: &[Trace]) -> MetaFile {
    let mut meta = MetaFile::default();
    meta.set_lines(vec![TraceLine {
        line_index: 0,
        from: 0,
        to: traces.len(),
    }]);
    meta.set_marks(
        traces
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_marked())
            .map(|(i, _)| i)
            .collect(),
    );
    meta
}

fn max_sample_range(traces: &[Trace]) -> Option<crate::trace::SampleRange> {
    let mut from: Option<usize> = None;
    let mut to: Option<usize> = None;
    for trace in traces {
        if let Some(range) = trace.sample_range() {
            from = Some(from.map_or(range.from(), |f: usize| f.min(range.from())));
            to = Some(to.map_or(range.to(), |t: usize| t.max(range.to())));
        }
    }
    match (from, to) {
        (Some(from), Some(to)) => Some(crate::trace::SampleRange::new(from, to)),
        _ => None,
    }
}

fn read_trace(
    bin_trace: &BinTrace,
    code: SampleCode,
    binary_header: &BinaryHeader,
) -> Result<Trace, FormatError> {
    let header = TraceHeader::decode(&bin_trace.header)?;
    let samples = bytes_to_samples(&bin_trace.data, code)?;

    let lat_lon = resolve_lat_lon(&header);
    let timestamp = resolve_timestamp(&header);

    let shared_header: Arc<[u8]> = Arc::from(bin_trace.header.clone().into_boxed_slice());
    let mut trace = Trace::new(shared_header, samples, lat_lon, timestamp);

    trace.set_marked(header.marked);

    let mut elevation = header.receiver_elevation;
    if binary_header.measurement_system == MEASUREMENT_FEET {
        elevation = (elevation as f64 * METERS_PER_FOOT) as f32;
    }
    trace.set_receiver_elevation(elevation);

    Ok(trace)
}

/// Position selection: prefer the fractional-degree doubles when both are
/// plausible, fall back to scaled source X/Y integers, else no position.
fn resolve_lat_lon(header: &TraceHeader) -> Option<LatLon> {
    let lon = header.longitude;
    let lat = header.latitude;

    if lon.is_nan()
        || lat.is_nan()
        || lon.abs() < 0.0001
        || lat.abs() < 0.0001
        || lon.abs() > 18000.0
        || lat.abs() > 18000.0
    {
        return scaled_source_lat_lon(header);
    }

    Some(LatLon::new(degrees_from_ddmm(lat), degrees_from_ddmm(lon)))
}

/// Source X/Y hold arc-seconds scaled by the coordinate scalar; a negative
/// scalar divides instead of multiplying.
fn scaled_source_lat_lon(header: &TraceHeader) -> Option<LatLon> {
    let scalar = header.scalar_for_coordinates;
    let k = if scalar >= 0 {
        scalar as f64
    } else {
        1.0 / -(scalar as f64)
    };

    let lon = k * header.source_x as f64 / 3600.0;
    let lat = k * header.source_y as f64 / 3600.0;

    if LatLon::is_valid_latitude(lat) && LatLon::is_valid_longitude(lon) {
        Some(LatLon::new(lat, lon))
    } else {
        None
    }
}

/// Reconstruct the recording timestamp. Any field outside its legal range
/// makes the whole timestamp unknown rather than failing the load.
fn resolve_timestamp(header: &TraceHeader) -> Option<DateTime<Utc>> {
    let current_year = Utc::now().year();

    if !in_range(header.year as i32, 1, current_year)
        || !in_range(header.day_of_year as i32, 1, 366)
        || !in_range(header.hour as i32, 0, 23)
        || !in_range(header.minute as i32, 0, 59)
        || !in_range(header.second as i32, 0, 59)
        || !in_range(header.millis as i32, 0, 999)
    {
        return None;
    }

    let start_of_year = Utc
        .with_ymd_and_hms(header.year as i32, 1, 1, 0, 0, 0)
        .single()?;
    let timestamp = start_of_year
        + Duration::days(header.day_of_year as i64 - 1)
        + Duration::hours(header.hour as i64)
        + Duration::minutes(header.minute as i64)
        + Duration::seconds(header.second as i64)
        + Duration::milliseconds(header.millis as i64);

    // day-of-year beyond the year's length is out of range too
    if timestamp.year() != header.year as i32 {
        return None;
    }
    Some(timestamp)
}

fn in_range(value: i32, min: i32, max: i32) -> bool {
    value >= min && value <= max
}
