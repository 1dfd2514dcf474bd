//! Raw sample block conversion.
//!
//! The binary header's data sample code selects how the fixed-size sample
//! block of each trace maps to amplitude values. Fixed-point encodings are
//! checked on write: a value outside the integer range is a hard error,
//! never a silent clamp.

use crate::error::FormatError;

/// Sample encoding selected by the `data_sample_code` header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCode {
    /// Code 2: two's-complement 32-bit integers.
    Int32,
    /// Code 3: two's-complement 16-bit integers.
    Int16,
    /// Code 5: IEEE-754 single-precision floats.
    Float32,
}

impl SampleCode {
    pub fn from_header(code: i16) -> Result<Self, FormatError> {
        match code {
            2 => Ok(SampleCode::Int32),
            3 => Ok(SampleCode::Int16),
            5 => Ok(SampleCode::Float32),
            other => Err(FormatError::UnsupportedEncoding(other)),
        }
    }

    pub fn to_header(self) -> i16 {
        match self {
            SampleCode::Int32 => 2,
            SampleCode::Int16 => 3,
            SampleCode::Float32 => 5,
        }
    }

    /// Width of one encoded sample, bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleCode::Int32 => 4,
            SampleCode::Int16 => 2,
            SampleCode::Float32 => 4,
        }
    }
}

/// Decode a raw sample block into amplitudes. All encodings are
/// little-endian.
pub fn bytes_to_samples(raw: &[u8], code: SampleCode) -> Result<Vec<f32>, FormatError> {
    let width = code.bytes_per_sample();
    if raw.len() % width != 0 {
        return Err(FormatError::MisalignedSampleBlock {
            len: raw.len(),
            width,
        });
    }

    let samples = match code {
        SampleCode::Int16 => raw
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes(c.try_into().unwrap()) as f32)
            .collect(),
        SampleCode::Int32 => raw
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes(c.try_into().unwrap()) as f32)
            .collect(),
        SampleCode::Float32 => raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect(),
    };
    Ok(samples)
}

/// Encode amplitudes back into a raw sample block.
///
/// The float encoding is bit-exact. For the fixed-point encodings any
/// value outside the target integer range reports [`FormatError::SampleOverflow`].
pub fn samples_to_bytes(samples: &[f32], code: SampleCode) -> Result<Vec<u8>, FormatError> {
    let mut raw = Vec::with_capacity(samples.len() * code.bytes_per_sample());
    match code {
        SampleCode::Int16 => {
            for &v in samples {
                let r = v.round() as f64;
                if !r.is_finite() || r < i16::MIN as f64 || r > i16::MAX as f64 {
                    return Err(FormatError::SampleOverflow { value: v });
                }
                raw.extend_from_slice(&(r as i16).to_le_bytes());
            }
        }
        SampleCode::Int32 => {
            for &v in samples {
                let r = v.round() as f64;
                if !r.is_finite() || r < i32::MIN as f64 || r > i32::MAX as f64 {
                    return Err(FormatError::SampleOverflow { value: v });
                }
                raw.extend_from_slice(&(r as i32).to_le_bytes());
            }
        }
        SampleCode::Float32 => {
            for &v in samples {
                raw.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
    Ok(raw)
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_code_mapping() {
        assert_eq!(SampleCode::from_header(5).unwrap(), SampleCode::Float32);
        assert_eq!(SampleCode::from_header(3).unwrap(), SampleCode::Int16);
        assert_eq!(SampleCode::from_header(2).unwrap(), SampleCode::Int32);
        assert!(matches!(
            SampleCode::from_header(1),
            Err(FormatError::UnsupportedEncoding(1))
        ));
    }

    #[test]
    fn test_int16_round_trip() {
        let values = [0.0f32, 1.0, -1.0, 32767.0, -32768.0];
        let raw = samples_to_bytes(&values, SampleCode::Int16).unwrap();
        let back = bytes_to_samples(&raw, SampleCode::Int16).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_int16_overflow_is_error() {
        let values = [40000.0f32];
        assert!(matches!(
            samples_to_bytes(&values, SampleCode::Int16),
            Err(FormatError::SampleOverflow { .. })
        ));
    }

    #[test]
    fn test_misaligned_block() {
        let raw = [0u8; 7];
        assert!(matches!(
            bytes_to_samples(&raw, SampleCode::Float32),
            Err(FormatError::MisalignedSampleBlock { len: 7, width: 4 })
        ));
    }

    proptest! {
        #[test]
        fn prop_float_round_trip_is_bit_exact(values in proptest::collection::vec(any::<f32>(), 0..256)) {
            let raw = samples_to_bytes(&values, SampleCode::Float32).unwrap();
            let back = bytes_to_samples(&raw, SampleCode::Float32).unwrap();
            prop_assert_eq!(back.len(), values.len());
            for (a, b) in back.iter().zip(values.iter()) {
                prop_assert_eq!(a.to_bits(), b.to_bits());
            }
        }

        #[test]
        fn prop_int32_round_trip(values in proptest::collection::vec(-8_388_608i32..8_388_608, 0..256)) {
            let values: Vec<f32> = values.into_iter().map(|v| v as f32).collect();
            let raw = samples_to_bytes(&values, SampleCode::Int32).unwrap();
            let back = bytes_to_samples(&raw, SampleCode::Int32).unwrap();
            prop_assert_eq!(back, values);
        }
    }
}
