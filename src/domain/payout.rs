use super::money::Amount;
use crate::error::BookingError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    Paypal,
    BankTransfer,
}

impl PayoutMethod {
    /// Smallest amount a teacher may withdraw through this method.
    pub fn minimum(self) -> Decimal {
        match self {
            Self::Paypal => dec!(10),
            Self::BankTransfer => dec!(100),
        }
    }
}

impl fmt::Display for PayoutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paypal => f.write_str("paypal"),
            Self::BankTransfer => f.write_str("bank_transfer"),
        }
    }
}

impl FromStr for PayoutMethod {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paypal" => Ok(Self::Paypal),
            "bank_transfer" => Ok(Self::BankTransfer),
            other => Err(BookingError::UnsupportedPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Rejected,
    Processed,
}

/// A teacher's withdrawal request. Created only once the amount clears the method minimum.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PayoutRequest {
    pub id: u64,
    pub teacher: String,
    pub amount: Amount,
    pub method: PayoutMethod,
    pub minimum_threshold: Decimal,
    pub status: PayoutStatus,
    pub requested_at: DateTime<Utc>,
}
