//! Recorded analysis sessions.
//!
//! - `step`: session operations and their JSON step form
//! - `algorithm`: the ordered step list with metadata
//! - `history`: per-step checkpoints anchored on the original data
//! - `recorder`: the `Session` that executes, records and replays operations

pub mod algorithm;
pub mod history;
pub mod recorder;
pub mod step;

pub use algorithm::*;
pub use history::*;
pub use recorder::*;
pub use step::*;
