//! Surface flattening.

use crate::error::ProcessError;
use crate::file::GprFile;
use crate::process::{check_cancelled, Change, Command, FileSnapshot, ProgressSink, UndoModel};

/// Shifts every trace vertically so its ground depth lands on the
/// profile's mid level, producing a flat surface. Destructive: a snapshot
/// is pushed before the samples move, and the ground profile is consumed.
pub struct FlattenSurface<'a> {
    undo: Option<&'a UndoModel>,
}

impl<'a> FlattenSurface<'a> {
    pub fn new(undo: &'a UndoModel) -> Self {
        Self { undo: Some(undo) }
    }

    pub fn without_undo() -> Self {
        Self { undo: None }
    }
}

impl Command for FlattenSurface<'_> {
    fn name(&self) -> &str {
        "Flatten surface"
    }

    fn change(&self) -> Change {
        Change::TraceValues
    }

    fn run(
        &self,
        file: &mut GprFile,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), ProcessError> {
        let hp = match file.ground_profile() {
            Some(hp) => hp.clone(),
            None => return Ok(()),
        };

        if let Some(undo) = self.undo {
            undo.push(FileSnapshot::take(file));
        }

        let level = (hp.min_depth() + hp.max_depth()) / 2;

        for trace in file.traces_mut() {
            check_cancelled(progress)?;

            let depth = hp.depth(trace.index());
            let shift = depth - level;

            let n = trace.num_samples();
            let mut shifted = vec![0.0f32; n];
            for (j, slot) in shifted.iter_mut().enumerate() {
                let src = j as i32 + shift;
                if src >= 0 && (src as usize) < n {
                    *slot = trace.sample(src as usize);
                }
            }
            for (j, &v) in shifted.iter().enumerate() {
                trace.set_sample(j, v);
            }
        }

        file.set_ground_profile(None);
        file.set_unsaved(true);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::process::NoProgress;
    use crate::profile::HorizontalProfile;
    use crate::test_util::synthetic_file;

    use super::*;

    #[test]
    fn test_flatten_moves_ground_to_level() {
        let mut file = synthetic_file(12, 40);
        // depth-coded samples so shifts are observable
        for trace in file.traces_mut() {
            for s in 0..40 {
                trace.set_sample(s, (trace.index() * 100 + s) as f32);
            }
        }

        let mut hp = HorizontalProfile::from_depths((0..12).map(|i| 14 + (i % 5)).collect());
        hp.finish();
        let level = (hp.min_depth() + hp.max_depth()) / 2;
        let before: Vec<f32> = file
            .traces()
            .iter()
            .enumerate()
            .map(|(i, t)| t.sample(hp.depth(i) as usize))
            .collect();
        file.set_ground_profile(Some(hp));

        FlattenSurface::without_undo()
            .run(&mut file, &mut NoProgress)
            .unwrap();

        // the value that sat at the per-trace ground depth now sits at
        // the common level
        assert!(file.ground_profile().is_none());
        for (trace, &b) in file.traces().iter().zip(before.iter()) {
            assert_eq!(trace.sample(level as usize), b, "trace {}", trace.index());
        }
    }

    #[test]
    fn test_flatten_without_profile_is_noop() {
        let mut file = synthetic_file(4, 20);
        file.traces_mut()[0].set_sample(5, 7.0);
        FlattenSurface::without_undo()
            .run(&mut file, &mut NoProgress)
            .unwrap();
        assert_eq!(file.traces()[0].sample(5), 7.0);
    }

    #[test]
    fn test_flatten_pushes_undo_frame() {
        let undo = UndoModel::new();
        let mut file = synthetic_file(6, 30);
        let mut hp = HorizontalProfile::from_depths(vec![10; 6]);
        hp.finish();
        file.set_ground_profile(Some(hp));
        file.traces_mut()[0].set_sample(10, 5.0);

        FlattenSurface::new(&undo)
            .run(&mut file, &mut NoProgress)
            .unwrap();

        assert!(!undo.is_empty());
        let frame = undo.pop().unwrap();
        frame.restore(&mut file);
        assert_eq!(file.traces()[0].sample(10), 5.0);
        assert!(file.ground_profile().is_some());
    }
}
