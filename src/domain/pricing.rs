use super::money::Amount;
use crate::error::BookingError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Platform rates applied on top of a teacher's base lesson price.
///
/// Both rates are fractions (`0.20` is 20%). They are configurable because
/// the platform has advertised more than one tax figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingPolicy {
    commission_rate: Decimal,
    tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            commission_rate: dec!(0.20),
            tax_rate: dec!(0.07),
        }
    }
}

impl PricingPolicy {
    pub fn new(commission_rate: Decimal, tax_rate: Decimal) -> Result<Self, BookingError> {
        let valid = |rate: Decimal| rate >= Decimal::ZERO && rate < Decimal::ONE;
        if !valid(commission_rate) || !valid(tax_rate) {
            return Err(BookingError::ValidationError(format!(
                "rates must be in [0, 1): commission={commission_rate}, tax={tax_rate}"
            )));
        }
        Ok(Self {
            commission_rate,
            tax_rate,
        })
    }

    pub fn commission_rate(&self) -> Decimal {
        self.commission_rate
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Splits a base price into commission, tax and the total charged to the student.
    ///
    /// Fails only when the total does not fit in a `Decimal`.
    pub fn quote(&self, base_price: Amount) -> Result<PriceBreakdown, BookingError> {
        let base = base_price.value();
        let too_large =
            || BookingError::ValidationError(format!("price {base} is too large to quote"));
        let commission = base
            .checked_mul(self.commission_rate)
            .ok_or_else(too_large)?;
        let subtotal = base.checked_add(commission).ok_or_else(too_large)?;
        let tax = subtotal.checked_mul(self.tax_rate).ok_or_else(too_large)?;
        Ok(PriceBreakdown {
            base_price: base,
            commission,
            tax,
            total_amount: subtotal.checked_add(tax).ok_or_else(too_large)?,
        })
    }
}

/// The money side of a lesson, fixed once at booking time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_price: Decimal,
    pub commission: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
}

impl PriceBreakdown {
    /// What the teacher is credited once the lesson completes.
    pub fn teacher_earnings(&self) -> Decimal {
        self.base_price - self.commission
    }
}
