//! Session execution for the `run` command.

mod session;
mod stats;
mod transcript;

pub use session::{run_session, SessionOptions};
pub use stats::RunStats;
pub use transcript::TranscriptWriter;
