//! Configuration
//!
//! Surface settings with JSON persistence to the platform config directory,
//! and the translation table for user-visible labels.

mod persistence;
mod settings;
mod translations;

pub use persistence::*;
pub use settings::*;
pub use translations::*;
