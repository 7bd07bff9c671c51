pub mod adaptive;
pub mod planner;
pub mod reinvestment;

pub use adaptive::{starting_params, StartingParams};
pub use planner::plan_operation;
pub use reinvestment::reinvestment_amount;

pub fn module_ready() -> bool {
    true
}
