//! Ground-level commands composing the detection and filtering stages.

use log::info;

use crate::error::ProcessError;
use crate::file::GprFile;
use crate::process::amplitude::{AmplitudeClassify, ScanSettings};
use crate::process::edge_filter::EdgeGroundFilter;
use crate::process::edges::EdgeFind;
use crate::process::ground::{AmplitudeMatrix, CohesiveScan, GroundDetector};
use crate::process::{Change, Command, ProgressSink};

/// Detect the ground surface with the given strategy, then classify edges
/// and erase the ones the surface explains.
pub struct FindGroundLevel<D: GroundDetector> {
    name: &'static str,
    detector: D,
}

impl FindGroundLevel<AmplitudeMatrix> {
    /// Amplitude-contrast strategy.
    pub fn amplitude() -> Self {
        Self {
            name: "Find ground level",
            detector: AmplitudeMatrix::default(),
        }
    }
}

impl FindGroundLevel<CohesiveScan> {
    /// Edge-cohesion strategy.
    pub fn cohesive() -> Self {
        Self {
            name: "Find ground level v2",
            detector: CohesiveScan,
        }
    }
}

impl<D: GroundDetector> Command for FindGroundLevel<D> {
    fn name(&self) -> &str {
        self.name
    }

    fn change(&self) -> Change {
        Change::TraceValues
    }

    fn run(
        &self,
        file: &mut GprFile,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProcessError> {
        progress.progress_msg("detecting ground surface");
        let profile = match self.detector.detect(file) {
            Some(profile) => profile,
            None => {
                info!(
                    "{}: no ground surface found in '{}'",
                    self.detector.name(),
                    file.file_name()
                );
                progress.progress_msg("no ground surface found");
                return Ok(());
            }
        };
        file.set_ground_profile(Some(profile));
        progress.progress_percent(40);

        progress.progress_msg("classifying edges");
        EdgeFind.run(file, progress)?;
        progress.progress_percent(60);

        progress.progress_msg("filtering surface edges");
        EdgeGroundFilter.run(file, progress)?;
        progress.progress_percent(100);

        file.set_unsaved(true);
        Ok(())
    }
}

/// Full algorithmic scan: edge classification, surface-edge removal, then
/// amplitude scoring of what remains.
pub struct AlgorithmicScan {
    pub settings: ScanSettings,
}

impl AlgorithmicScan {
    pub fn new(settings: ScanSettings) -> Self {
        Self { settings }
    }
}

impl Default for AlgorithmicScan {
    fn default() -> Self {
        Self::new(ScanSettings::default())
    }
}

impl Command for AlgorithmicScan {
    fn name(&self) -> &str {
        "Algorithmic scan"
    }

    fn change(&self) -> Change {
        Change::TraceValues
    }

    fn run(
        &self,
        file: &mut GprFile,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProcessError> {
        progress.progress_msg("classifying edges");
        EdgeFind.run(file, progress)?;
        progress.progress_percent(30);

        progress.progress_msg("filtering surface edges");
        EdgeGroundFilter.run(file, progress)?;
        progress.progress_percent(70);

        progress.progress_msg("scoring amplitudes");
        AmplitudeClassify::new(self.settings).run(file, progress)?;
        progress.progress_percent(100);
        Ok(())
    }
}
