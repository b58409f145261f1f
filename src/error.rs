use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Payout of {amount} via {method} is below the minimum of {minimum}")]
    BelowMinimumThreshold {
        method: String,
        amount: Decimal,
        minimum: Decimal,
    },
    #[error("Unsupported payment method: {0}")]
    UnsupportedPaymentMethod(String),
    #[error("Payment declined by {0}")]
    PaymentDeclined(String),
    #[error("Concurrent update on lesson {0}")]
    Conflict(u32),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl BookingError {
    pub fn balance_overflow(teacher: &str) -> Self {
        Self::ValidationError(format!("balance of {teacher} would overflow"))
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for BookingError {
    fn from(err: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        Self::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, BookingError>;
