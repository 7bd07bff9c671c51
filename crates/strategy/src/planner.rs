use core_sim::{AdjustmentFlags, OperationPlan, SimConfig, SimState};

use crate::adaptive::starting_params;
use crate::reinvestment::reinvestment_amount;

/// Multiplier applied to the reinvestment slice on each reschedule pass.
const REINVEST_BACKOFF: f64 = 0.95;
/// Below this the reinvestment slice counts as fully backed off.
const REINVEST_FLOOR: f64 = 1e-9;
/// Nudge past the exact margin needed so the feasibility test clears.
const MARGIN_RAISE_EPSILON: f64 = 1e-6;
/// Per-pass decrement when walking the borrow margin down.
const MARGIN_STEP: f64 = 0.01;
/// Per-pass decrement when walking the repayment ratio down.
const REPAYMENT_STEP: f64 = 0.005;

/// Plans one operation against a state snapshot, or certifies that no
/// feasible operation exists.
///
/// Each pass recomputes the safety bounds, proposes the smallest borrow that
/// clears the profit floor, and tests it against the margin and health
/// ceilings. An infeasible pass applies exactly one adjustment, in priority
/// order: back off reinvestment, lower the borrow margin, lower the
/// repayment ratio, and as a last resort raise the margin straight to the
/// level that admits the required borrow. The attempt cap and the
/// `max_borrow_margin` ceiling are the only exits when nothing fits, so the
/// loop is bounded by construction.
///
/// Whenever the returned plan is feasible, both hard constraints hold:
/// `net_profit() >= min_profit_per_op` and the post-operation health
/// `supply * health_collateral_factor / (borrow_current + borrow_amount)`
/// stays above `min_health_ratio`. The state snapshot is never mutated.
pub fn plan_operation(state: &SimState, config: &SimConfig) -> OperationPlan {
    let params = starting_params(state.operations_since_progress);
    let mut borrow_margin = params.borrow_margin;
    let mut repayment_ratio = params.repayment_ratio;
    let mut reinvest_multiplier = 1.0_f64;
    let mut flags = AdjustmentFlags::default();

    let mut attempts = 0_u32;
    let mut min_required_borrow = 0.0;
    let mut max_safe_borrow = 0.0;

    while attempts < config.max_reschedule_attempts {
        attempts += 1;

        let max_borrow_by_margin = state.supply_current * borrow_margin - state.borrow_current;
        let max_borrow_by_health = state.supply_current * config.health_collateral_factor
            / config.min_health_ratio
            - state.borrow_current;
        max_safe_borrow = max_borrow_by_margin.min(max_borrow_by_health).max(0.0);

        // Repayment scales with the outstanding borrow, never with the new
        // borrow, which keeps the requirement free of circularity.
        let repay_amount = repayment_ratio * state.borrow_current;
        let platform_fee = config.platform_fee_rate * repay_amount;

        let provisional_profit = max_safe_borrow - repay_amount - platform_fee;
        let reinvest_amount = reinvestment_amount(
            provisional_profit,
            state.distance_to_target(),
            state.supply_current,
            state.operations_since_progress,
        ) * reinvest_multiplier;

        min_required_borrow =
            config.min_profit_per_op + reinvest_amount + repay_amount + platform_fee;

        if min_required_borrow <= max_safe_borrow {
            // Borrowing the minimum that clears the profit floor leaves the
            // widest gap to both safety ceilings.
            return OperationPlan {
                borrow_amount: min_required_borrow,
                reinvest_amount,
                repay_amount,
                platform_fee,
                feasible: true,
                attempts_used: attempts,
                adjustment_flags: flags,
                min_required_borrow,
                max_safe_borrow,
            };
        }

        if reinvest_multiplier > 0.0 && reinvest_amount > 0.0 {
            reinvest_multiplier *= REINVEST_BACKOFF;
            if reinvest_amount < REINVEST_FLOOR {
                reinvest_multiplier = 0.0;
            }
            flags.reinvestment = true;
        } else if borrow_margin > config.min_borrow_margin {
            borrow_margin = (borrow_margin - MARGIN_STEP).max(config.min_borrow_margin);
            flags.borrow_margin = true;
        } else if repayment_ratio > config.min_repayment_ratio {
            repayment_ratio = (repayment_ratio - REPAYMENT_STEP).max(config.min_repayment_ratio);
            flags.repayment_ratio = true;
        } else {
            // Jump the margin straight to the level that admits the required
            // borrow instead of stepping toward it.
            let needed_margin = (state.borrow_current + min_required_borrow)
                / state.supply_current
                + MARGIN_RAISE_EPSILON;
            let raised = needed_margin
                .max(borrow_margin)
                .min(config.max_borrow_margin);
            if raised <= borrow_margin {
                // Margin is already at its ceiling and still insufficient.
                return OperationPlan::skipped(attempts, flags, min_required_borrow, max_safe_borrow);
            }
            borrow_margin = raised;
            flags.margin_raised = true;
        }
    }

    OperationPlan::skipped(attempts, flags, min_required_borrow, max_safe_borrow)
}
