//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! session parameters, stage definitions, pipeline state, the text-generation
//! trait and the layered error types.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Data Model
//! - `SessionParameters` are supplied once per run and never mutated
//! - `PipelineState` is write-once per output key
//! - A stage only reads session parameters and outputs of earlier stages

mod config;
mod error;
mod generator;
mod session;
mod stage;
mod state;

pub use config::*;
pub use error::*;
pub use generator::*;
pub use session::*;
pub use stage::*;
pub use state::PipelineState;
