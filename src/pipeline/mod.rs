/*!
 * File pipeline: one drawing from input to translated output.
 *
 * - `state`: the run state machine
 * - `run`: per-run work folder, state and log
 * - `orchestrator`: the steps themselves
 */

pub mod orchestrator;
pub mod run;
pub mod state;

pub use orchestrator::{FilePipeline, FileReport, PipelineSettings};
pub use run::PipelineRun;
pub use state::PipelineState;
