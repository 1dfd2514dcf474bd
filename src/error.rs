use std::io;
use std::path::PathBuf;

/// Structural problems in a survey file. Any of these aborts the load of
/// the single file; the caller moves on to other files.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{path}: truncated file, expected {expected} bytes for {section}, got {actual}")]
    Truncated {
        path: PathBuf,
        section: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported data sample code {0}")]
    UnsupportedEncoding(i16),

    #[error("sample block length {len} is not a multiple of {width}-byte samples")]
    MisalignedSampleBlock { len: usize, width: usize },

    #[error("sample value {value} does not fit the fixed-point encoding")]
    SampleOverflow { value: f32 },

    #[error("header field {field} out of range: {value}")]
    FieldOutOfRange { field: &'static str, value: i64 },

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Failure to persist a file. The original file on disk is untouched.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to replace {path}: {source}")]
    Replace { path: PathBuf, source: io::Error },

    #[error("{0}")]
    Format(#[from] FormatError),
}

/// Pipeline outcome that is not a success. `Cancelled` is cooperative
/// control flow, not a failure; callers must not report it as an error.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Format(#[from] FormatError),

    #[error("{0}")]
    Save(#[from] SaveError),

    #[error("{0}")]
    Other(String),
}

impl ProcessError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessError::Cancelled)
    }
}
