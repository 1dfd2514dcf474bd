//! Reading and writing the raw survey file layout.
//!
//! A file is a text preamble, one binary header block, then repeated
//! (trace header, sample block) pairs until end of file. Reads are strictly
//! sequential block reads; a short block anywhere is a fatal
//! [`FormatError::Truncated`]. Save writes the whole file to a temporary
//! sibling path and atomically renames it over the target, so a failed save
//! never corrupts the original.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{FormatError, SaveError};
use crate::header::{BinaryHeader, BIN_HEADER_LEN, TEXT_HEADER_LEN, TRACE_HEADER_LEN};
use crate::samples::SampleCode;

/// One undecoded trace: the raw header block and the raw sample block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinTrace {
    pub header: Vec<u8>,
    pub data: Vec<u8>,
}

/// Raw byte-level image of a survey file.
#[derive(Debug, Clone, Default)]
pub struct BinFile {
    pub txt_hdr: Vec<u8>,
    pub bin_hdr: Vec<u8>,
    pub traces: Vec<BinTrace>,
}

impl BinFile {
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader, path)
    }

    pub fn read_from<R: Read>(reader: &mut R, path: &Path) -> Result<Self, FormatError> {
        let txt_hdr = read_block(reader, TEXT_HEADER_LEN, "text header", path)?;
        let bin_hdr = read_block(reader, BIN_HEADER_LEN, "binary header", path)?;

        let header = BinaryHeader::decode(&bin_hdr)?;
        let code = SampleCode::from_header(header.data_sample_code)?;
        let block_len = header.samples_per_trace.max(0) as usize * code.bytes_per_sample();

        debug!(
            "loading '{}': {} samples per trace, sample code {}",
            path.display(),
            header.samples_per_trace,
            header.data_sample_code
        );

        let mut traces = Vec::new();
        loop {
            let trace_hdr = match read_block_or_eof(reader, TRACE_HEADER_LEN, "trace header", path)?
            {
                Some(buf) => buf,
                None => break,
            };
            let data = read_block(reader, block_len, "sample block", path)?;
            traces.push(BinTrace {
                header: trace_hdr,
                data,
            });
        }

        debug!("loaded '{}': {} traces", path.display(), traces.len());
        Ok(Self {
            txt_hdr,
            bin_hdr,
            traces,
        })
    }

    /// Write the full file. All-or-nothing: content goes to a temporary
    /// sibling first and replaces the target only after a successful flush.
    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        let tmp_path = tmp_sibling(path);

        let result = (|| -> Result<(), std::io::Error> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            self.write_to(&mut writer)?;
            writer.flush()
        })();

        if let Err(source) = result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(SaveError::Write {
                path: tmp_path,
                source,
            });
        }

        std::fs::rename(&tmp_path, path).map_err(|source| SaveError::Replace {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("saved '{}': {} traces", path.display(), self.traces.len());
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), std::io::Error> {
        writer.write_all(&self.txt_hdr)?;
        writer.write_all(&self.bin_hdr)?;
        for trace in &self.traces {
            writer.write_all(&trace.header)?;
            writer.write_all(&trace.data)?;
        }
        Ok(())
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_block<R: Read>(
    reader: &mut R,
    len: usize,
    section: &'static str,
    path: &Path,
) -> Result<Vec<u8>, FormatError> {
    match read_block_or_eof(reader, len, section, path)? {
        Some(buf) => Ok(buf),
        None => Err(FormatError::Truncated {
            path: path.to_path_buf(),
            section,
            expected: len,
            actual: 0,
        }),
    }
}

/// Read exactly `len` bytes. A clean end of input before the first byte
/// yields `None`; a partial block is a truncation error.
fn read_block_or_eof<R: Read>(
    reader: &mut R,
    len: usize,
    section: &'static str,
    path: &Path,
) -> Result<Option<Vec<u8>>, FormatError> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(FormatError::Truncated {
                path: path.to_path_buf(),
                section,
                expected: len,
                actual: filled,
            });
        }
        filled += n;
    }
    Ok(Some(buf))
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use crate::header::SAMPLES_PER_TRACE;

    use super::*;

    fn sample_file(num_traces: usize, samples_per_trace: i16) -> Vec<u8> {
        let mut bytes = vec![0u8; TEXT_HEADER_LEN];
        let mut bin_hdr = vec![0u8; BIN_HEADER_LEN];
        bin_hdr[SAMPLES_PER_TRACE.offset..SAMPLES_PER_TRACE.offset + 2]
            .copy_from_slice(&samples_per_trace.to_le_bytes());
        // IEEE float samples
        bin_hdr[24..26].copy_from_slice(&5i16.to_le_bytes());
        bytes.extend_from_slice(&bin_hdr);

        for t in 0..num_traces {
            bytes.extend_from_slice(&vec![t as u8; TRACE_HEADER_LEN]);
            for s in 0..samples_per_trace {
                bytes.extend_from_slice(&(s as f32).to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn test_read_counts_blocks() {
        let bytes = sample_file(3, 16);
        let mut cursor = Cursor::new(bytes);
        let bin = BinFile::read_from(&mut cursor, Path::new("test.sgy")).unwrap();
        assert_eq!(bin.traces.len(), 3);
        assert_eq!(bin.traces[0].header.len(), TRACE_HEADER_LEN);
        assert_eq!(bin.traces[0].data.len(), 16 * 4);
    }

    #[test]
    fn test_truncated_sample_block() {
        let mut bytes = sample_file(2, 16);
        bytes.truncate(bytes.len() - 10);
        let mut cursor = Cursor::new(bytes);
        let err = BinFile::read_from(&mut cursor, Path::new("test.sgy")).unwrap_err();
        assert!(matches!(err, FormatError::Truncated { section: "sample block", .. }));
    }

    #[test]
    fn test_truncated_trace_header() {
        let mut bytes = sample_file(1, 4);
        bytes.extend_from_slice(&[1, 2, 3]);
        let mut cursor = Cursor::new(bytes);
        let err = BinFile::read_from(&mut cursor, Path::new("test.sgy")).unwrap_err();
        assert!(matches!(err, FormatError::Truncated { section: "trace header", .. }));
    }

    #[test]
    fn test_write_read_round_trip() {
        let bytes = sample_file(4, 8);
        let mut cursor = Cursor::new(bytes.clone());
        let bin = BinFile::read_from(&mut cursor, Path::new("test.sgy")).unwrap();

        let mut out = Vec::new();
        bin.write_to(&mut out).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_save_replaces_atomically() -> eyre::Result<()> {
        let dir = std::env::temp_dir().join("radargram-binfile-test");
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("roundtrip.sgy");

        let bytes = sample_file(2, 4);
        let mut cursor = Cursor::new(bytes.clone());
        let bin = BinFile::read_from(&mut cursor, Path::new("roundtrip.sgy"))?;

        bin.save(&path)?;
        assert_eq!(std::fs::read(&path)?, bytes);
        assert!(!tmp_sibling(&path).exists());

        std::fs::remove_file(&path)?;
        Ok(())
    }
}
