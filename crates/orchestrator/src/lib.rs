//! Tutoring prompt pipeline
//!
//! Runs the six tutoring stages in order against a [`contracts::TextGenerator`],
//! threading each stage's output into the prompts of later stages.

pub mod pipeline;
pub mod stages;
pub mod template;
pub mod validation;

pub use pipeline::{Pipeline, PipelineConfig, PipelineRun};
pub use stages::{tutor_stages, STAGE_ORDER};
pub use template::Template;
pub use validation::{validate_overrides, validate_stages};
