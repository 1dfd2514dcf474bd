//! Reading, processing and writing GPR radargrams stored in a SEG-Y-like
//! binary layout.
//!
//! A survey file decodes into a [`GprFile`]: preserved raw headers plus an
//! owned list of [`Trace`]s. The [`process`] module provides the named
//! pipeline operations — edge classification, ground-surface detection,
//! surface-edge filtering, background removal, flattening — that mutate
//! traces in place with progress reporting and cooperative cancellation.

pub mod binfile;
pub mod error;
pub mod file;
pub mod header;
pub mod latlon;
pub mod meta;
pub mod normalize;
pub mod process;
pub mod profile;
pub mod samples;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_util;

pub use crate::binfile::{BinFile, BinTrace};
pub use crate::error::{FormatError, ProcessError, SaveError};
pub use crate::file::{GprFile, SurveyFile};
pub use crate::latlon::LatLon;
pub use crate::profile::{HorizontalProfile, ScanProfile};
pub use crate::trace::{EdgeKind, SampleRange, Trace};

#[cfg(test)]
mod tests {
    use crate::process::flatten::FlattenSurface;
    use crate::process::level::FindGroundLevel;
    use crate::process::{Command, NoProgress};
    use crate::test_util::{synthetic_file_with_ground, TEST_SAMPLE_INTERVAL};

    #[test]
    fn test_end_to_end_find_ground_and_flatten() {
        // 10 traces, 50 samples, surface at sample 22
        let mut file = synthetic_file_with_ground(10, 50, 22);

        assert_eq!(file.num_traces(), 10);
        assert_eq!(file.max_samples(), 50);
        assert_eq!(file.sample_interval(), TEST_SAMPLE_INTERVAL);

        let latlon = file.traces()[0].lat_lon().expect("decoded position");
        assert!((latlon.lat() - 56.0).abs() < 1e-6, "lat {}", latlon.lat());
        assert!((latlon.lon() - 24.1).abs() < 1e-6, "lon {}", latlon.lon());

        FindGroundLevel::amplitude()
            .run(&mut file, &mut NoProgress)
            .unwrap();

        let hp = file.ground_profile().expect("ground profile").clone();
        assert!(
            (20..=25).contains(&hp.avg_depth()),
            "avg depth {}",
            hp.avg_depth()
        );

        let level = (hp.min_depth() + hp.max_depth()) / 2;
        let before: Vec<f32> = file
            .traces()
            .iter()
            .enumerate()
            .map(|(i, t)| t.sample(hp.depth(i) as usize))
            .collect();

        FlattenSurface::without_undo()
            .run(&mut file, &mut NoProgress)
            .unwrap();

        for (trace, &b) in file.traces().iter().zip(before.iter()) {
            assert_eq!(
                trace.sample(level as usize),
                b,
                "trace {} ground sample moved wrong",
                trace.index()
            );
        }
    }
}
