/*!
 * Bookkeeping for one file run: current state, private work folder and log.
 */

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use super::state::PipelineState;
use crate::errors::{FileFailure, PipelineError};
use crate::translation::LogCapture;

/// One drawing going through the pipeline
///
/// Owns the temporary work folder; it is removed by [`PipelineRun::finish`]
/// or, if the run is abandoned, when the run is dropped.
#[derive(Debug)]
pub struct PipelineRun {
    input: PathBuf,
    state: PipelineState,
    temp_dir: Option<TempDir>,
    log: LogCapture,
    started: Instant,
}

impl PipelineRun {
    /// Start a run, creating its work folder under `work_dir` or the system temp folder
    pub fn start(input: &Path, work_dir: Option<&Path>) -> Result<Self, FileFailure> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "drawing".to_string());

        let prefix = format!("cadtranslator-{}-", stem);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let created = match work_dir {
            Some(dir) => std::fs::create_dir_all(dir).and_then(|_| builder.tempdir_in(dir)),
            None => builder.tempdir(),
        };
        let temp_dir = created.map_err(|e| FileFailure {
            input: input.to_path_buf(),
            state: PipelineState::Created,
            error: PipelineError::Io(e),
        })?;

        let name = input
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| stem.clone());

        Ok(Self {
            input: input.to_path_buf(),
            state: PipelineState::Created,
            temp_dir: Some(temp_dir),
            log: LogCapture::new(name),
            started: Instant::now(),
        })
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn log(&self) -> &LogCapture {
        &self.log
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Path of the work folder; empty once the run is finished
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.as_ref().map(|d| d.path()).unwrap_or_else(|| Path::new(""))
    }

    /// Move to the next state
    pub fn advance(&mut self, to: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_transition_to(to) {
            return Err(PipelineError::InvalidTransition { from: self.state, to });
        }
        self.log.audit(format!("state: {} -> {}", self.state, to));
        self.state = to;
        Ok(())
    }

    /// Record a failure; the returned value carries the state the run was in
    pub fn fail(&mut self, error: PipelineError) -> FileFailure {
        let state = self.state;
        self.log.error(format!("Failed while {}: {}", state, error));
        if self.state.can_transition_to(PipelineState::Failed) {
            self.state = PipelineState::Failed;
        }
        FileFailure {
            input: self.input.clone(),
            state,
            error,
        }
    }

    /// Remove the work folder; called on success and on failure
    pub fn finish(&mut self) {
        if let Some(dir) = self.temp_dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                self.log.warn(format!("Could not remove work folder {:?}: {}", path, e));
            }
        }
    }
}
