mod config;
mod plan;
mod state;

pub use config::{ConfigError, SimConfig};
pub use plan::{AdjustmentFlags, OperationPlan};
pub use state::{SimState, StateError};
