use std::fmt;

use serde::Serialize;

/// Immutable per-run configuration. Built once via [`SimConfig::validated`]
/// and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimConfig {
    pub min_profit_per_op: f64,
    pub min_borrow_margin: f64,
    pub min_repayment_ratio: f64,
    pub max_reschedule_attempts: u32,
    pub platform_fee_rate: f64,
    pub health_collateral_factor: f64,
    pub min_health_ratio: f64,
    pub max_borrow_margin: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    NonPositiveMinProfit,
    MinBorrowMarginOutOfRange,
    MinRepaymentRatioOutOfRange,
    ZeroMaxRescheduleAttempts,
    PlatformFeeRateOutOfRange,
    HealthCollateralFactorOutOfRange,
    MinHealthRatioNotAboveOne,
    MaxBorrowMarginOutOfRange,
    MarginBoundsInverted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveMinProfit => {
                write!(f, "min_profit_per_op must be a finite positive amount")
            }
            Self::MinBorrowMarginOutOfRange => {
                write!(f, "min_borrow_margin must lie strictly between 0 and 1")
            }
            Self::MinRepaymentRatioOutOfRange => {
                write!(f, "min_repayment_ratio must lie strictly between 0 and 1")
            }
            Self::ZeroMaxRescheduleAttempts => {
                write!(f, "max_reschedule_attempts must be at least 1")
            }
            Self::PlatformFeeRateOutOfRange => {
                write!(f, "platform_fee_rate must lie in [0, 1)")
            }
            Self::HealthCollateralFactorOutOfRange => {
                write!(
                    f,
                    "health_collateral_factor must lie strictly between 0 and 1"
                )
            }
            Self::MinHealthRatioNotAboveOne => {
                write!(f, "min_health_ratio must be finite and greater than 1")
            }
            Self::MaxBorrowMarginOutOfRange => {
                write!(f, "max_borrow_margin must lie strictly between 0 and 1")
            }
            Self::MarginBoundsInverted => {
                write!(f, "max_borrow_margin must exceed min_borrow_margin")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl SimConfig {
    /// Checks every bound the planner relies on. Invalid configuration is
    /// rejected here so the planner never revalidates mid-run.
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !self.min_profit_per_op.is_finite() || self.min_profit_per_op <= 0.0 {
            return Err(ConfigError::NonPositiveMinProfit);
        }
        if !in_open_unit_interval(self.min_borrow_margin) {
            return Err(ConfigError::MinBorrowMarginOutOfRange);
        }
        if !in_open_unit_interval(self.min_repayment_ratio) {
            return Err(ConfigError::MinRepaymentRatioOutOfRange);
        }
        if self.max_reschedule_attempts == 0 {
            return Err(ConfigError::ZeroMaxRescheduleAttempts);
        }
        if !self.platform_fee_rate.is_finite()
            || self.platform_fee_rate < 0.0
            || self.platform_fee_rate >= 1.0
        {
            return Err(ConfigError::PlatformFeeRateOutOfRange);
        }
        if !in_open_unit_interval(self.health_collateral_factor) {
            return Err(ConfigError::HealthCollateralFactorOutOfRange);
        }
        if !self.min_health_ratio.is_finite() || self.min_health_ratio <= 1.0 {
            return Err(ConfigError::MinHealthRatioNotAboveOne);
        }
        if !in_open_unit_interval(self.max_borrow_margin) {
            return Err(ConfigError::MaxBorrowMarginOutOfRange);
        }
        if self.max_borrow_margin <= self.min_borrow_margin {
            return Err(ConfigError::MarginBoundsInverted);
        }

        Ok(self)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            min_profit_per_op: 1e-6,
            min_borrow_margin: 0.50,
            min_repayment_ratio: 0.03,
            max_reschedule_attempts: 50,
            platform_fee_rate: 0.0025,
            health_collateral_factor: 0.74,
            min_health_ratio: 1.01,
            max_borrow_margin: 0.73,
        }
    }
}

fn in_open_unit_interval(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value < 1.0
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, SimConfig};

    #[test]
    fn default_config_passes_validation() {
        assert!(SimConfig::default().validated().is_ok());
    }

    #[test]
    fn rejects_non_positive_min_profit() {
        let config = SimConfig {
            min_profit_per_op: 0.0,
            ..SimConfig::default()
        };

        assert_eq!(config.validated(), Err(ConfigError::NonPositiveMinProfit));
    }

    #[test]
    fn rejects_min_health_ratio_at_or_below_one() {
        let config = SimConfig {
            min_health_ratio: 1.0,
            ..SimConfig::default()
        };

        assert_eq!(
            config.validated(),
            Err(ConfigError::MinHealthRatioNotAboveOne)
        );
    }

    #[test]
    fn rejects_inverted_margin_bounds() {
        let config = SimConfig {
            min_borrow_margin: 0.73,
            max_borrow_margin: 0.73,
            ..SimConfig::default()
        };

        assert_eq!(config.validated(), Err(ConfigError::MarginBoundsInverted));
    }

    #[test]
    fn rejects_platform_fee_rate_of_one() {
        let config = SimConfig {
            platform_fee_rate: 1.0,
            ..SimConfig::default()
        };

        assert_eq!(
            config.validated(),
            Err(ConfigError::PlatformFeeRateOutOfRange)
        );
    }

    #[test]
    fn rejects_non_finite_collateral_factor() {
        let config = SimConfig {
            health_collateral_factor: f64::NAN,
            ..SimConfig::default()
        };

        assert_eq!(
            config.validated(),
            Err(ConfigError::HealthCollateralFactorOutOfRange)
        );
    }
}
