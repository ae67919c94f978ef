//! geomix math utilities.

pub mod math;

pub use math::error::{DistributionAxis, MixtureError};
pub use math::mixture::{MixtureModel, ModelSummary, DEFAULT_TOLERANCE};
pub use math::stable::*;
