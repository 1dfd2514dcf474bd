//! Builders for synthetic in-memory survey files used across tests.

use std::io::Cursor;
use std::path::Path;

use crate::binfile::BinFile;
use crate::file::GprFile;
use crate::header::{
    BIN_HEADER_LEN, DATA_SAMPLE_CODE, LATITUDE, LONGITUDE, MEASUREMENT_SYSTEM, SAMPLE_INTERVAL,
    SAMPLES_PER_TRACE, TEXT_HEADER_LEN, TRACE_HEADER_LEN, TRACE_NUM_SAMPLES,
};
use crate::latlon::ddmm_from_degrees;

pub(crate) const TEST_SAMPLE_INTERVAL: i16 = 100;

fn put_i16(buf: &mut [u8], offset: usize, value: i16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

/// Raw file bytes: float32 samples, meters, fixed sample interval.
pub(crate) fn synthetic_bytes(
    num_traces: usize,
    samples_per_trace: i16,
    sample_at: impl Fn(usize, usize) -> f32,
    with_positions: bool,
) -> Vec<u8> {
    let mut bytes = vec![0u8; TEXT_HEADER_LEN];

    let mut bin_hdr = vec![0u8; BIN_HEADER_LEN];
    put_i16(&mut bin_hdr, SAMPLE_INTERVAL.offset, TEST_SAMPLE_INTERVAL);
    put_i16(&mut bin_hdr, SAMPLES_PER_TRACE.offset, samples_per_trace);
    put_i16(&mut bin_hdr, DATA_SAMPLE_CODE.offset, 5);
    put_i16(&mut bin_hdr, MEASUREMENT_SYSTEM.offset, 1);
    bytes.extend_from_slice(&bin_hdr);

    for t in 0..num_traces {
        let mut header = vec![0u8; TRACE_HEADER_LEN];
        put_i16(&mut header, TRACE_NUM_SAMPLES.offset, samples_per_trace);
        if with_positions {
            // ~5.6 cm between consecutive traces
            let lat = 56.0 + t as f64 * 5e-7;
            let lon = 24.1;
            put_f64(&mut header, LATITUDE.offset, ddmm_from_degrees(lat));
            put_f64(&mut header, LONGITUDE.offset, ddmm_from_degrees(lon));
        }
        bytes.extend_from_slice(&header);

        for s in 0..samples_per_trace as usize {
            bytes.extend_from_slice(&sample_at(t, s).to_le_bytes());
        }
    }
    bytes
}

pub(crate) fn file_from_bytes(bytes: Vec<u8>) -> GprFile {
    let mut cursor = Cursor::new(bytes);
    let bin = BinFile::read_from(&mut cursor, Path::new("synthetic.sgy")).unwrap();
    GprFile::from_bin_file(bin, Path::new("synthetic.sgy")).unwrap()
}

/// All-zero samples, no positions; inter-trace distances fall back to the
/// 5 cm default.
pub(crate) fn synthetic_file(num_traces: usize, samples_per_trace: i16) -> GprFile {
    file_from_bytes(synthetic_bytes(
        num_traces,
        samples_per_trace,
        |_, _| 0.0,
        false,
    ))
}

/// Quiet air column above `ground`, strong alternating reflections below.
/// The polarity alternates per trace as well, so background removal does
/// not cancel the signal.
pub(crate) fn synthetic_file_with_ground(
    num_traces: usize,
    samples_per_trace: i16,
    ground: usize,
) -> GprFile {
    file_from_bytes(synthetic_bytes(
        num_traces,
        samples_per_trace,
        move |t, s| {
            let sign = if (t + s) % 2 == 0 { 1.0f32 } else { -1.0 };
            if s < ground {
                sign * 0.1
            } else {
                sign * 10.0
            }
        },
        true,
    ))
}
