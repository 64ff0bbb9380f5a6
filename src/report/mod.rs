//! Report module - descriptive analysis, run summary and the hand-off bundle

pub mod bundle;
pub mod eda;
pub mod summary;

pub use bundle::*;
pub use eda::*;
pub use summary::*;
