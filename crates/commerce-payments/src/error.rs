//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error, raw message passed through
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Off-session charge attempted with no stored payment method
    #[error("No payment method on file for customer {0}")]
    NoPaymentMethod(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// A Stripe object came back without a field we require
    #[error("Missing field on Stripe object: {0}")]
    MissingObjectField(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// HTTP status the edge should answer with
    pub fn status(&self) -> u16 {
        match self {
            PaymentError::NoPaymentMethod(_)
            | PaymentError::WebhookSignature(_)
            | PaymentError::WebhookParse(_) => 400,
            _ => 500,
        }
    }
}

impl From<stripe::StripeError> for PaymentError {
    fn from(err: stripe::StripeError) -> Self {
        PaymentError::Stripe(err.to_string())
    }
}
