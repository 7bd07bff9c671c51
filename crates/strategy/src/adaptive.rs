/// Repayment ratio and borrow margin a planning pass starts from, before
/// any rescheduling moves them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartingParams {
    pub repayment_ratio: f64,
    pub borrow_margin: f64,
}

/// Picks starting parameters from the stagnation counter. A stalled run
/// repays less per operation and is allowed a more aggressive margin.
pub fn starting_params(operations_since_progress: u32) -> StartingParams {
    if operations_since_progress > 5 {
        StartingParams {
            repayment_ratio: 0.035,
            borrow_margin: 0.73,
        }
    } else if operations_since_progress > 2 {
        StartingParams {
            repayment_ratio: 0.07,
            borrow_margin: 0.69,
        }
    } else {
        StartingParams {
            repayment_ratio: 0.11,
            borrow_margin: 0.69,
        }
    }
}
