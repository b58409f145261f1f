use crate::domain::money::Amount;
use crate::domain::payout::{PayoutMethod, PayoutRequest, PayoutStatus};
use crate::domain::ports::PayoutStoreBox;
use crate::error::{BookingError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Admits teacher withdrawal requests that clear the per-method minimum.
///
/// Approval and the actual transfer happen elsewhere; no fee is taken here.
pub struct PayoutGate {
    payouts: PayoutStoreBox,
}

impl PayoutGate {
    pub fn new(payouts: PayoutStoreBox) -> Self {
        Self { payouts }
    }

    pub async fn request_payout(
        &self,
        teacher: &str,
        amount: Decimal,
        method: PayoutMethod,
        now: DateTime<Utc>,
    ) -> Result<PayoutRequest> {
        if teacher.trim().is_empty() {
            return Err(BookingError::ValidationError("teacher is required".into()));
        }
        let minimum = method.minimum();
        if amount < minimum {
            tracing::warn!(teacher, %amount, %method, %minimum, "payout below minimum");
            return Err(BookingError::BelowMinimumThreshold {
                method: method.to_string(),
                amount,
                minimum,
            });
        }

        let request = PayoutRequest {
            id: self.payouts.next_id().await?,
            teacher: teacher.to_string(),
            amount: Amount::new(amount)?,
            method,
            minimum_threshold: minimum,
            status: PayoutStatus::Pending,
            requested_at: now,
        };
        self.payouts.store(request.clone()).await?;
        tracing::info!(teacher, payout = request.id, %amount, %method, "payout requested");
        Ok(request)
    }

    pub async fn requests_for(&self, teacher: &str) -> Result<Vec<PayoutRequest>> {
        self.payouts.for_teacher(teacher).await
    }

    pub async fn requests(&self) -> Result<Vec<PayoutRequest>> {
        self.payouts.get_all().await
    }
}
