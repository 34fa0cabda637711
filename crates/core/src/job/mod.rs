//! Jobs, their results and their lifecycle states.

mod plan;
mod types;

pub use plan::JobPlan;
pub use types::*;
