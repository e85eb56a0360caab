// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod context;
mod orchestrator;
mod processor;
mod progress;

pub use context::RunContext;
pub use orchestrator::{CompileOutcome, Compiler};
pub use processor::{FileProcessor, ProcessedFile};
pub use progress::{PipelineStats, ProgressTracker};
