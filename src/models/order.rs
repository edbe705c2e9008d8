use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use validator::{Validate, ValidationError};

use crate::{
    errors::{OrderField, ServiceError},
    models::item::LineItem,
};

pub const DEFAULT_PICKUP: &str = "ASAP";
const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_DIGITS: usize = 7;

/// How the customer pays for a pickup order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMode {
    Online,
    #[default]
    PayAtPickup,
}

impl PaymentMode {
    /// Label printed on the kitchen ticket.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Online => "Paid Online",
            PaymentMode::PayAtPickup => "Pay at Pickup",
        }
    }
}

/// Contact details typed into the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Validate)]
pub struct CustomerFields {
    #[validate(custom = "validate_name")]
    pub name: String,

    #[validate(custom = "validate_phone")]
    pub phone: String,

    /// Minutes until pickup, or "ASAP"
    #[serde(default)]
    pub pickup: String,

    #[serde(default)]
    pub notes: String,
}

impl CustomerFields {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    pub fn with_pickup(mut self, pickup: impl Into<String>) -> Self {
        self.pickup = pickup.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Trimmed copy with the pickup time defaulted to "ASAP".
    pub fn normalized(&self) -> Self {
        let pickup = self.pickup.trim();
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            pickup: if pickup.is_empty() {
                DEFAULT_PICKUP.to_string()
            } else {
                pickup.to_string()
            },
            notes: self.notes.trim().to_string(),
        }
    }

    /// Validates the form, reporting the first bad field in form order.
    pub fn check(&self) -> Result<(), ServiceError> {
        let errors = match self.validate() {
            Ok(()) => return Ok(()),
            Err(errors) => errors,
        };
        let field_errors = errors.field_errors();

        for field in [OrderField::Name, OrderField::Phone] {
            if let Some(first) = field_errors.get(field.as_ref()).and_then(|e| e.first()) {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                return Err(ServiceError::ValidationError { field, message });
            }
        }

        Err(ServiceError::ValidationError {
            field: OrderField::Name,
            message: errors.to_string(),
        })
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < MIN_NAME_CHARS {
        let mut err = ValidationError::new("name_too_short");
        err.message = Some("name needs at least 2 characters".into());
        return Err(err);
    }
    Ok(())
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone_digits(phone).len() < MIN_PHONE_DIGITS {
        let mut err = ValidationError::new("phone_too_short");
        err.message = Some("phone needs at least 7 digits".into());
        return Err(err);
    }
    Ok(())
}

/// Digits of a phone number with punctuation stripped.
pub fn phone_digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Derived cart totals. Serialized with the short names used by the
/// confirmation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    #[serde(rename = "sub")]
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tip: Decimal,
    #[serde(rename = "tot")]
    pub total: Decimal,
}

/// A submitted pickup order. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Human-readable id, `SP-YYMMDD-HHMM-RAND`
    pub id: String,
    pub ts: DateTime<Utc>,
    pub payment: PaymentMode,
    pub customer: CustomerFields,
    pub items: Vec<LineItem>,
    pub sub_total: Decimal,
    pub tax: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub tax_rate: Decimal,
    pub tax_name: String,
    pub currency: String,
}

impl Order {
    pub fn totals(&self) -> Totals {
        Totals {
            subtotal: self.sub_total,
            tax: self.tax,
            tip: self.tip,
            total: self.total,
        }
    }
}

/// Record kept after a successful submission for the confirmation view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOrder {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub pickup: String,
    /// Store phone to call with changes
    pub phone: String,
    pub items: Vec<LineItem>,
    pub totals: Totals,
    pub currency: String,
    #[serde(default)]
    pub payment: PaymentMode,
}

impl LastOrder {
    pub fn from_order(order: &Order, phone: &str) -> Self {
        Self {
            id: order.id.clone(),
            created_at: order.ts,
            pickup: order.customer.pickup.clone(),
            phone: phone.to_string(),
            items: order.items.clone(),
            totals: order.totals(),
            currency: order.currency.clone(),
            payment: order.payment,
        }
    }
}

/// Non-blocking notices raised while building an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Advisory {
    /// Online payment was requested but no payment link is configured.
    PaymentDowngraded,
}

impl Advisory {
    pub fn message(&self) -> String {
        match self {
            Advisory::PaymentDowngraded => ServiceError::PaymentUnavailable.status_text(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltOrder {
    pub order: Order,
    pub advisory: Option<Advisory>,
}
