use std::fmt;

use serde::Serialize;

/// Mutable position state. The planner only ever reads a snapshot of this;
/// all mutation happens in the orchestrating engine between planner calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimState {
    pub supply_current: f64,
    pub borrow_current: f64,
    pub supply_target: f64,
    pub operations_since_progress: u32,
    pub accumulated_extra_supply: f64,
    pub wallet_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    NonPositiveSupply,
    NegativeBorrow,
    BorrowExceedsSupply,
    TargetNotAboveSupply,
    NegativeWalletBalance,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveSupply => {
                write!(f, "initial supply must be a finite positive amount")
            }
            Self::NegativeBorrow => {
                write!(f, "initial borrow must be a finite non-negative amount")
            }
            Self::BorrowExceedsSupply => {
                write!(f, "initial borrow must not exceed initial supply")
            }
            Self::TargetNotAboveSupply => {
                write!(f, "supply target must exceed the initial supply")
            }
            Self::NegativeWalletBalance => {
                write!(f, "wallet balance must be a finite non-negative amount")
            }
        }
    }
}

impl std::error::Error for StateError {}

impl SimState {
    pub fn new(
        supply_initial: f64,
        borrow_initial: f64,
        supply_target: f64,
        wallet_balance: f64,
    ) -> Result<Self, StateError> {
        if !supply_initial.is_finite() || supply_initial <= 0.0 {
            return Err(StateError::NonPositiveSupply);
        }
        if !borrow_initial.is_finite() || borrow_initial < 0.0 {
            return Err(StateError::NegativeBorrow);
        }
        if borrow_initial > supply_initial {
            return Err(StateError::BorrowExceedsSupply);
        }
        if !supply_target.is_finite() || supply_target <= supply_initial {
            return Err(StateError::TargetNotAboveSupply);
        }
        if !wallet_balance.is_finite() || wallet_balance < 0.0 {
            return Err(StateError::NegativeWalletBalance);
        }

        Ok(Self {
            supply_current: supply_initial,
            borrow_current: borrow_initial,
            supply_target,
            operations_since_progress: 0,
            accumulated_extra_supply: 0.0,
            wallet_balance,
        })
    }

    pub fn distance_to_target(&self) -> f64 {
        self.supply_target - self.supply_current
    }

    pub fn target_reached(&self) -> bool {
        self.supply_current >= self.supply_target
    }

    /// Position health as effective collateral over outstanding borrow.
    /// A debt-free position is infinitely healthy.
    pub fn health(&self, collateral_factor: f64) -> f64 {
        if self.borrow_current <= 0.0 {
            return f64::INFINITY;
        }
        self.supply_current * collateral_factor / self.borrow_current
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            supply_current: 1_000.0,
            borrow_current: 600.0,
            supply_target: 1_500.0,
            operations_since_progress: 0,
            accumulated_extra_supply: 0.0,
            wallet_balance: 0.0,
        }
    }
}
