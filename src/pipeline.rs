// src/pipeline.rs
pub mod config;
pub mod report;
pub mod runner;
pub mod stages;

pub use config::PipelineConfig;
pub use report::{RunOutput, StageReport};
pub use runner::{PipelineRunner, FLAGGED_FINAL, MONTHLY_STAGE_1, ROSTER_STAGE_1, ROSTER_STAGE_2};
