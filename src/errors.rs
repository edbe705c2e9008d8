use serde::Serialize;
use strum::{AsRefStr, Display};

use crate::models::item::Family;

/// Customer form fields that can fail validation, in form order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderField {
    Name,
    Phone,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error on {field}: {message}")]
    ValidationError { field: OrderField, message: String },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Online payment is not configured")]
    PaymentUnavailable,

    #[error("Order sink error: {0}")]
    SinkError(String),

    #[error("Catalog load error: {0}")]
    CatalogLoad(String),

    #[error("Config load error: {0}")]
    ConfigLoad(String),

    #[error("Corrupt session state: {0}")]
    CorruptSessionState(String),

    #[error("Menu family unavailable: {0}")]
    FamilyUnavailable(Family),

    #[error("Unknown {family} option: {id}")]
    UnknownOption { family: Family, id: String },

    #[error("No cart line at position {0}")]
    InvalidIndex(usize),

    #[error("Invalid tip: {0}")]
    InvalidTip(String),

    #[error("An order submission is already in progress")]
    SubmissionInProgress,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::StorageError(err.to_string())
    }
}

impl ServiceError {
    /// Errors the customer can fix from the form without calling the store.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ValidationError { .. }
                | Self::EmptyCart
                | Self::PaymentUnavailable
                | Self::InvalidIndex(_)
                | Self::InvalidTip(_)
                | Self::SubmissionInProgress
        )
    }

    /// Short, actionable status text for the ordering form.
    /// `contact_phone` is offered whenever the customer should call instead.
    pub fn status_text(&self, contact_phone: &str) -> String {
        match self {
            Self::ValidationError {
                field: OrderField::Name,
                ..
            } => "Please enter your name.".to_string(),
            Self::ValidationError {
                field: OrderField::Phone,
                ..
            } => "Please enter a valid phone number.".to_string(),
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::PaymentUnavailable => {
                "Online payment isn’t available right now — set to Pay at Pickup.".to_string()
            }
            Self::SubmissionInProgress => "Sending…".to_string(),
            Self::InvalidIndex(_) => "That item is no longer in your cart.".to_string(),
            Self::InvalidTip(_) => "Please pick one of the tip options.".to_string(),
            Self::FamilyUnavailable(_) | Self::UnknownOption { .. } => {
                "That item isn’t available right now.".to_string()
            }
            Self::SinkError(_) => format!(
                "Sorry, we couldn’t send the order. Please call {}.",
                contact_phone
            ),
            Self::CorruptSessionState(_) | Self::StorageError(_) | Self::SerializationError(_) => {
                format!(
                    "Sorry, we couldn’t save your cart. Please try again or call {}.",
                    contact_phone
                )
            }
            Self::CatalogLoad(_) | Self::ConfigLoad(_) => format!(
                "Sorry, the menu isn’t available right now. Please call {}.",
                contact_phone
            ),
        }
    }
}
