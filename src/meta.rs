//! Sidecar metadata file.
//!
//! A JSON document next to the survey file carries state that does not fit
//! the binary layout: the persisted sample range, detected line boundaries,
//! user marks and display settings. Marks are stored by absolute trace
//! index so they survive trimming.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::trace::SampleRange;

const META_FILE_EXTENSION: &str = "ghmr.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    pub from: usize,
    pub to: usize,
}

/// One contiguous survey line inside the file, by trace index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLine {
    pub line_index: usize,
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceMark {
    pub trace_index: usize,
}

/// Display amplitude range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeRange {
    pub min: f64,
    pub max: f64,
}

/// Serialized sidecar structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_range: Option<IndexRange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<TraceLine>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<TraceMark>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amplitude_range: Option<AmplitudeRange>,
}

/// Runtime view of the sidecar, tied to a survey file path.
#[derive(Debug, Clone, Default)]
pub struct MetaFile {
    sample_range: Option<SampleRange>,
    lines: Vec<TraceLine>,
    marks: BTreeSet<usize>,
    contrast: Option<f64>,
    amplitude_range: Option<AmplitudeRange>,
}

impl MetaFile {
    /// Sidecar path for a survey file: same directory, same base name,
    /// `.ghmr.json` extension.
    pub fn meta_path(source: &Path) -> PathBuf {
        source.with_extension(META_FILE_EXTENSION)
    }

    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let file = File::open(path)?;
        let meta: TraceMeta = serde_json::from_reader(BufReader::new(file))
            .map_err(std::io::Error::other)?;
        debug!("loaded meta '{}'", path.display());
        Ok(Self::from_state(meta))
    }

    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.to_state())
            .map_err(std::io::Error::other)?;
        debug!("saved meta '{}'", path.display());
        Ok(())
    }

    pub fn from_state(meta: TraceMeta) -> Self {
        Self {
            sample_range: meta
                .sample_range
                .map(|r| SampleRange::new(r.from, r.to.max(r.from))),
            lines: meta.lines,
            marks: meta.marks.iter().map(|m| m.trace_index).collect(),
            contrast: meta.contrast,
            amplitude_range: meta.amplitude_range,
        }
    }

    pub fn to_state(&self) -> TraceMeta {
        TraceMeta {
            sample_range: self.sample_range.map(|r| IndexRange {
                from: r.from(),
                to: r.to(),
            }),
            lines: self.lines.clone(),
            marks: self
                .marks
                .iter()
                .map(|&trace_index| TraceMark { trace_index })
                .collect(),
            contrast: self.contrast,
            amplitude_range: self.amplitude_range,
        }
    }

    pub fn sample_range(&self) -> Option<SampleRange> {
        self.sample_range
    }

    pub fn set_sample_range(&mut self, range: Option<SampleRange>) {
        self.sample_range = range;
    }

    pub fn marks(&self) -> &BTreeSet<usize> {
        &self.marks
    }

    pub fn set_marks(&mut self, marks: BTreeSet<usize>) {
        self.marks = marks;
    }

    pub fn lines(&self) -> &[TraceLine] {
        &self.lines
    }

    pub fn set_lines(&mut self, lines: Vec<TraceLine>) {
        self.lines = lines;
    }

    pub fn contrast(&self) -> Option<f64> {
        self.contrast
    }

    pub fn set_contrast(&mut self, contrast: Option<f64>) {
        self.contrast = contrast;
    }

    pub fn amplitude_range(&self) -> Option<AmplitudeRange> {
        self.amplitude_range
    }

    pub fn set_amplitude_range(&mut self, range: Option<AmplitudeRange>) {
        self.amplitude_range = range;
    }
}
