//! Brillouin line-shape models.
//!
//! Models are implemented as small, pure functions of the frequency axis and a
//! parameter slice so that the fitting code can stay generic.

pub mod model;

pub use model::*;
