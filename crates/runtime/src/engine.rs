use std::fmt;

use core_sim::{AdjustmentFlags, OperationPlan, SimConfig, SimState};
use serde::Serialize;
use strategy::plan_operation;
use time::OffsetDateTime;

use crate::events::{OperationStage, RuntimeEvent};
use crate::logging::{JournalRowKind, OperationJournalRow};
use crate::metrics::RescheduleMetrics;

/// Supply movement below this counts as a stagnated operation.
const PROGRESS_EPSILON: f64 = 3e-5;

/// Default cap on the share of current supply the wallet may inject into a
/// single operation.
pub const DEFAULT_WALLET_SUPPLY_LIMIT: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    InvalidWalletSupplyLimit,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWalletSupplyLimit => {
                write!(f, "wallet supply limit must be a finite fraction in [0, 1]")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// What one engine step did: the plan, the pre-step injections, and the
/// staged events the step emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReport {
    pub operation: u64,
    pub plan: OperationPlan,
    pub extra_supply_applied: f64,
    pub wallet_supply_applied: f64,
    pub realized_profit: f64,
    pub supply_after: f64,
    pub borrow_after: f64,
    pub health_after: f64,
    pub events: Vec<RuntimeEvent>,
}

impl OperationReport {
    pub fn journal_row(&self) -> OperationJournalRow {
        let kind = if self.plan.feasible {
            JournalRowKind::OperationApplied
        } else {
            JournalRowKind::OperationSkipped
        };

        OperationJournalRow {
            operation: self.operation,
            kind,
            supply: self.supply_after,
            borrow: self.borrow_after,
            borrow_amount: self.plan.borrow_amount,
            reinvest_amount: self.plan.reinvest_amount,
            repay_amount: self.plan.repay_amount,
            platform_fee: self.plan.platform_fee,
            profit: self.realized_profit,
            health: self.health_after,
            attempts: self.plan.attempts_used,
            detail: adjustment_summary(&self.plan.adjustment_flags),
        }
    }
}

/// Final statistics of a run, in the shape the reporting surface exposes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub started_at_unix: i64,
    pub target_reached: bool,
    pub supply_final: f64,
    pub supply_target: f64,
    pub borrow_final: f64,
    pub wallet_remaining: f64,
    pub total_operations: u64,
    pub skipped_operations: u64,
    pub stagnated_operations: u64,
    pub total_profit: f64,
    pub total_fees: f64,
    pub total_repayment: f64,
    pub smallest_operation_profit: Option<f64>,
    pub total_reschedule_attempts: u64,
    pub max_reschedule_attempts_in_one_operation: u32,
    pub final_health: f64,
}

/// Drives a whole simulation run: pre-step injections, one planner call per
/// operation, state transitions, and the running totals behind the summary.
/// The engine is the only owner of state mutation; the planner itself only
/// ever sees snapshots.
pub struct LoopEngine {
    config: SimConfig,
    state: SimState,
    wallet_supply_limit: f64,
    operation: u64,
    skipped_operations: u64,
    stagnated_operations: u64,
    total_profit: f64,
    total_fees: f64,
    total_repayment: f64,
    smallest_profit: Option<f64>,
    metrics: RescheduleMetrics,
    started_at_unix: i64,
}

impl LoopEngine {
    pub fn new(state: SimState, config: SimConfig) -> Self {
        Self {
            config,
            state,
            wallet_supply_limit: DEFAULT_WALLET_SUPPLY_LIMIT,
            operation: 0,
            skipped_operations: 0,
            stagnated_operations: 0,
            total_profit: 0.0,
            total_fees: 0.0,
            total_repayment: 0.0,
            smallest_profit: None,
            metrics: RescheduleMetrics::new(),
            started_at_unix: OffsetDateTime::now_utc().unix_timestamp(),
        }
    }

    pub fn with_wallet_supply_limit(mut self, limit: f64) -> Result<Self, EngineError> {
        if !limit.is_finite() || !(0.0..=1.0).contains(&limit) {
            return Err(EngineError::InvalidWalletSupplyLimit);
        }
        self.wallet_supply_limit = limit;
        Ok(self)
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn metrics(&self) -> &RescheduleMetrics {
        &self.metrics
    }

    /// Runs one operation: inject available funds, plan, apply or skip.
    pub async fn step_once(&mut self) -> OperationReport {
        self.operation += 1;
        let operation = self.operation;
        let mut events = vec![RuntimeEvent::new(operation, OperationStage::OperationStarted)];
        tokio::task::yield_now().await;

        let supply_before = self.state.supply_current;
        let (extra_supply_applied, wallet_supply_applied) = self.inject_available_funds();
        let injected = extra_supply_applied > 0.0 || wallet_supply_applied > 0.0;
        if injected {
            events.push(RuntimeEvent::new(operation, OperationStage::ExtraSupplyApplied));
        }

        let plan = plan_operation(&self.state, &self.config);
        events.push(RuntimeEvent::new(operation, OperationStage::PlanComputed));
        self.metrics.record_attempts(plan.attempts_used);

        let realized_profit = if plan.feasible {
            let profit = apply_plan(&mut self.state, &plan);
            self.total_profit += profit;
            self.total_fees += plan.platform_fee;
            self.total_repayment += plan.repay_amount;
            self.smallest_profit = Some(match self.smallest_profit {
                Some(smallest) => smallest.min(profit),
                None => profit,
            });
            events.push(RuntimeEvent::new(operation, OperationStage::StateApplied));
            profit
        } else {
            self.skipped_operations += 1;
            events.push(RuntimeEvent::new(operation, OperationStage::OperationSkipped));
            0.0
        };

        // A skipped operation with no injection must leave the state
        // untouched, stagnation counter included.
        if plan.feasible || injected {
            let progress = self.state.supply_current - supply_before;
            if note_progress(&mut self.state, progress) {
                self.stagnated_operations += 1;
            }
        }

        OperationReport {
            operation,
            plan,
            extra_supply_applied,
            wallet_supply_applied,
            realized_profit,
            supply_after: self.state.supply_current,
            borrow_after: self.state.borrow_current,
            health_after: self.state.health(self.config.health_collateral_factor),
            events,
        }
    }

    /// Repeats operations until the target is reached, the operation cap is
    /// hit, or a skipped operation proves the run stuck: a deterministic
    /// planner over unchanged state cannot answer differently next time.
    pub async fn run_to_target(&mut self, max_operations: u64) -> RunSummary {
        self.run_to_target_observed(max_operations, |_| {}).await
    }

    /// Like [`run_to_target`](Self::run_to_target), but hands every
    /// operation report to the observer before deciding whether to continue.
    pub async fn run_to_target_observed<F>(
        &mut self,
        max_operations: u64,
        mut observe: F,
    ) -> RunSummary
    where
        F: FnMut(&OperationReport),
    {
        let mut operations_run = 0;
        while operations_run < max_operations && !self.state.target_reached() {
            let report = self.step_once().await;
            operations_run += 1;
            observe(&report);

            let injected =
                report.extra_supply_applied > 0.0 || report.wallet_supply_applied > 0.0;
            if !report.plan.feasible && !injected {
                break;
            }
        }

        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            started_at_unix: self.started_at_unix,
            target_reached: self.state.target_reached(),
            supply_final: self.state.supply_current,
            supply_target: self.state.supply_target,
            borrow_final: self.state.borrow_current,
            wallet_remaining: self.state.wallet_balance,
            total_operations: self.operation,
            skipped_operations: self.skipped_operations,
            stagnated_operations: self.stagnated_operations,
            total_profit: self.total_profit,
            total_fees: self.total_fees,
            total_repayment: self.total_repayment,
            smallest_operation_profit: self.smallest_profit,
            total_reschedule_attempts: self.metrics.total_attempts(),
            max_reschedule_attempts_in_one_operation: self
                .metrics
                .percentiles()
                .map(|report| report.max_attempts)
                .unwrap_or(0),
            final_health: self.state.health(self.config.health_collateral_factor),
        }
    }

    /// Pre-steps: drain accumulated profit into supply, then top up from the
    /// wallet, both capped at the remaining distance to target. The wallet
    /// injection is additionally capped at a share of current supply.
    fn inject_available_funds(&mut self) -> (f64, f64) {
        let mut from_accumulated = 0.0;
        if self.state.accumulated_extra_supply > 0.0 {
            from_accumulated = self
                .state
                .accumulated_extra_supply
                .min(self.state.distance_to_target())
                .max(0.0);
            self.state.supply_current += from_accumulated;
            self.state.accumulated_extra_supply -= from_accumulated;
        }

        let mut from_wallet = 0.0;
        if self.state.supply_current < self.state.supply_target && self.state.wallet_balance > 0.0 {
            let shortfall = self.state.supply_target - self.state.supply_current;
            let per_operation_cap = self.wallet_supply_limit * self.state.supply_current;
            from_wallet = shortfall.min(per_operation_cap).min(self.state.wallet_balance);
            self.state.supply_current += from_wallet;
            self.state.wallet_balance -= from_wallet;
        }

        (from_accumulated, from_wallet)
    }
}

/// Applies a feasible plan to the state and returns the realized profit.
/// Skipped plans are applied for free: nothing changes and the profit is 0.
pub fn apply_plan(state: &mut SimState, plan: &OperationPlan) -> f64 {
    if !plan.feasible {
        return 0.0;
    }

    state.borrow_current += plan.borrow_amount - plan.repay_amount;
    state.supply_current += plan.reinvest_amount;
    let profit = plan.net_profit();
    state.accumulated_extra_supply += profit;
    profit
}

fn note_progress(state: &mut SimState, progress: f64) -> bool {
    if progress < PROGRESS_EPSILON {
        state.operations_since_progress += 1;
        true
    } else {
        state.operations_since_progress = 0;
        false
    }
}

fn adjustment_summary(flags: &AdjustmentFlags) -> String {
    let mut parts = Vec::new();
    if flags.reinvestment {
        parts.push("reinvestment");
    }
    if flags.borrow_margin {
        parts.push("borrow_margin");
    }
    if flags.repayment_ratio {
        parts.push("repayment_ratio");
    }
    if flags.margin_raised {
        parts.push("margin_raised");
    }
    parts.join(",")
}
