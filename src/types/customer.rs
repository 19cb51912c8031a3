//! Customer signals entered in single-customer mode

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Allowed tenure in months
pub const TENURE_RANGE: RangeInclusive<u32> = 0..=72;
/// Allowed monthly charge in whole dollars
pub const MONTHLY_CHARGES_RANGE: RangeInclusive<u32> = 20..=120;
/// Allowed service complexity score
pub const SERVICE_COMPLEXITY_RANGE: RangeInclusive<u32> = 0..=6;

/// Behavioral signals for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerSignals {
    /// Tenure in months
    pub tenure: u32,

    /// Monthly charges in dollars
    pub monthly_charges: u32,

    /// Month-to-month contract
    pub is_month_to_month: bool,

    /// Fiber internet service
    pub fiber_internet: bool,

    /// No tech support subscribed
    pub no_tech_support: bool,

    /// Manual (non-automatic) payment method
    pub manual_payment: bool,

    /// Number of add-on services (0-6)
    pub service_complexity: u32,
}

impl CustomerSignals {
    /// Reject values outside the ranges the input widgets allow
    pub fn validate(&self) -> Result<()> {
        check_range("tenure", self.tenure, &TENURE_RANGE)?;
        check_range("monthly_charges", self.monthly_charges, &MONTHLY_CHARGES_RANGE)?;
        check_range(
            "service_complexity",
            self.service_complexity,
            &SERVICE_COMPLEXITY_RANGE,
        )?;
        Ok(())
    }
}

fn check_range(name: &str, value: u32, range: &RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ChurnError::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            name,
            range.start(),
            range.end(),
            value
        )))
    }
}

impl Default for CustomerSignals {
    fn default() -> Self {
        Self {
            tenure: 12,
            monthly_charges: 70,
            is_month_to_month: false,
            fiber_internet: false,
            no_tech_support: false,
            manual_payment: false,
            service_complexity: 2,
        }
    }
}
