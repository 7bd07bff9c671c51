use serde::Serialize;

/// Which planner parameters were moved away from their initial proposal
/// while rescheduling an infeasible operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdjustmentFlags {
    pub reinvestment: bool,
    pub borrow_margin: bool,
    pub repayment_ratio: bool,
    pub margin_raised: bool,
}

impl AdjustmentFlags {
    pub fn any(&self) -> bool {
        self.reinvestment || self.borrow_margin || self.repayment_ratio || self.margin_raised
    }
}

/// One planned operation. Produced fresh per planner call and immutable
/// once returned; it carries no identity across calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OperationPlan {
    pub borrow_amount: f64,
    pub reinvest_amount: f64,
    pub repay_amount: f64,
    pub platform_fee: f64,
    pub feasible: bool,
    pub attempts_used: u32,
    pub adjustment_flags: AdjustmentFlags,
    pub min_required_borrow: f64,
    pub max_safe_borrow: f64,
}

impl OperationPlan {
    /// A skipped operation: all amounts zero, applying it is a no-op.
    pub fn skipped(
        attempts_used: u32,
        adjustment_flags: AdjustmentFlags,
        min_required_borrow: f64,
        max_safe_borrow: f64,
    ) -> Self {
        Self {
            borrow_amount: 0.0,
            reinvest_amount: 0.0,
            repay_amount: 0.0,
            platform_fee: 0.0,
            feasible: false,
            attempts_used,
            adjustment_flags,
            min_required_borrow,
            max_safe_borrow,
        }
    }

    /// Profit realized by executing the plan before reinvestment is
    /// redeposited: borrow less reinvestment, repayment, and fee.
    pub fn net_profit(&self) -> f64 {
        self.borrow_amount - self.reinvest_amount - self.repay_amount - self.platform_fee
    }
}
