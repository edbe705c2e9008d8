use crate::{
    errors::ServiceError,
    models::catalog::StoreSettings,
    models::order::{Advisory, BuiltOrder, CustomerFields, Order, PaymentMode, DEFAULT_PICKUP},
    services::commerce::cart_service::Cart,
};
use chrono::{DateTime, Local, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, instrument, warn};

static ORDER_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^SP-\d{6}-\d{4}-\d{4}$").unwrap());

/// Generates an order id `SP-YYMMDD-HHMM-RAND` from the local clock.
pub fn next_order_id<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    next_order_id_with(now, &mut rand::thread_rng())
}

/// Same as [`next_order_id`] with a caller-supplied random source.
pub fn next_order_id_with<Tz, R>(now: &DateTime<Tz>, rng: &mut R) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
    R: Rng + ?Sized,
{
    let suffix: u16 = rng.gen_range(1000..=9999);
    format!("SP-{}-{}", now.format("%y%m%d-%H%M"), suffix)
}

pub fn is_order_id(id: &str) -> bool {
    ORDER_ID_RE.is_match(id)
}

/// Text shown once the order has been sent.
pub fn confirmation_message(order: &Order, phone: &str) -> String {
    let pickup = order.customer.pickup.as_str();
    let when = if pickup.is_empty() || pickup == DEFAULT_PICKUP {
        DEFAULT_PICKUP.to_string()
    } else {
        format!("in ~{} min", pickup)
    };
    format!(
        "Order {}. Pickup: {}. If anything changes, call {}.",
        order.id, when, phone
    )
}

/// Assembles immutable orders from the cart and the checkout form.
#[derive(Debug, Clone)]
pub struct OrderService {
    settings: Arc<StoreSettings>,
    currency: String,
}

impl OrderService {
    pub fn new(settings: Arc<StoreSettings>, currency: impl Into<String>) -> Self {
        Self {
            settings,
            currency: currency.into(),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Builds an order snapshot.
    ///
    /// An empty cart is rejected before the form is looked at. Online payment
    /// without a usable payment link is downgraded to pay-at-pickup and
    /// reported through the advisory instead of failing.
    #[instrument(skip(self, cart, customer), fields(lines = cart.len()))]
    pub fn build_order(
        &self,
        cart: &Cart,
        customer: &CustomerFields,
        requested_payment: PaymentMode,
        now: DateTime<Local>,
    ) -> Result<BuiltOrder, ServiceError> {
        if cart.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let customer = customer.normalized();
        customer.check()?;

        let (payment, advisory) = match requested_payment {
            PaymentMode::Online if !self.settings.has_online_payment() => {
                warn!("Online payment requested but no payment link is configured");
                (PaymentMode::PayAtPickup, Some(Advisory::PaymentDowngraded))
            }
            other => (other, None),
        };

        let totals = cart.compute_totals();
        let order = Order {
            id: next_order_id(&now),
            ts: now.with_timezone(&Utc),
            payment,
            customer,
            items: cart.items().to_vec(),
            sub_total: totals.subtotal,
            tax: totals.tax,
            tip: totals.tip,
            total: totals.total,
            tax_rate: cart.tax_rate(),
            tax_name: self.settings.tax_name.clone(),
            currency: self.currency.clone(),
        };

        info!(order_id = %order.id, total = %order.total, payment = %order.payment, "Order built");
        Ok(BuiltOrder { order, advisory })
    }
}
