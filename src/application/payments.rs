use crate::domain::money::Amount;
use crate::domain::ports::PaymentMethodAdapterBox;
use crate::error::{BookingError, Result};
use std::collections::HashMap;

/// Routes student charges to the adapter registered under the method name.
#[derive(Default)]
pub struct PaymentGateway {
    adapters: HashMap<String, PaymentMethodAdapterBox>,
}

impl PaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, adapter: PaymentMethodAdapterBox) -> Self {
        self.register(adapter);
        self
    }

    pub fn register(&mut self, adapter: PaymentMethodAdapterBox) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub async fn charge(&self, method: &str, student: &str, amount: Amount) -> Result<()> {
        let adapter = self
            .adapters
            .get(method)
            .ok_or_else(|| BookingError::UnsupportedPaymentMethod(method.to_string()))?;

        if adapter.charge(student, amount).await? {
            tracing::info!(method, student, %amount, "student charged");
            Ok(())
        } else {
            tracing::warn!(method, student, %amount, "charge declined");
            Err(BookingError::PaymentDeclined(method.to_string()))
        }
    }
}
