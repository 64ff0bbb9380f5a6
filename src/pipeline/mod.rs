//! Pipeline module - the dataset preparation steps

pub mod correlation;
pub mod error;
pub mod filter;
pub mod folds;
pub mod labels;
pub mod loader;
pub mod missing;
pub mod recipe;
pub mod sampler;
pub mod split;

pub use correlation::*;
pub use error::{require_column, PipelineError};
pub use filter::*;
pub use folds::*;
pub use labels::*;
pub use loader::*;
pub use missing::*;
pub use recipe::*;
pub use sampler::*;
pub use split::*;
