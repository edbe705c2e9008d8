use crate::{
    errors::ServiceError,
    models::catalog::{Catalog, PaymentLink},
    models::order::{Advisory, BuiltOrder, CustomerFields, LastOrder, Order, PaymentMode},
    services::commerce::{
        cart_service::CartService,
        order_service::{confirmation_message, OrderService},
        submission_service::{OrderSink, OrderSubmission},
        ticket_service::render_kitchen_ticket,
    },
    session::{load_json, save_json, SessionStore, LAST_ORDER_KEY},
};
use chrono::Local;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Outcome of a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct Confirmation {
    pub order: Order,
    pub advisory: Option<Advisory>,
    /// Text for the confirmation view
    pub message: String,
    pub ticket: String,
    /// Usable pay-online links; empty unless the order is paid online
    pub payment_links: Vec<PaymentLink>,
}

/// An order built and rendered without being sent.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPreview {
    #[serde(flatten)]
    pub built: BuiltOrder,
    pub ticket: String,
}

/// Turns the session cart into a submitted order.
///
/// Only one submission runs at a time across all clones of the service.
#[derive(Clone)]
pub struct CheckoutService {
    catalog: Arc<Catalog>,
    orders: Arc<OrderService>,
    sink: Arc<dyn OrderSink>,
    in_flight: Arc<AtomicBool>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<Catalog>,
        orders: Arc<OrderService>,
        sink: Arc<dyn OrderSink>,
    ) -> Self {
        Self {
            catalog,
            orders,
            sink,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Builds the order and its kitchen ticket without submitting anything.
    pub fn preview<S: SessionStore>(
        &self,
        cart: &CartService<S>,
        customer: &CustomerFields,
        payment: PaymentMode,
    ) -> Result<OrderPreview, ServiceError> {
        let built = self
            .orders
            .build_order(cart.cart(), customer, payment, Local::now())?;
        let ticket = self.ticket(&built.order);
        Ok(OrderPreview { built, ticket })
    }

    /// Validates, builds and submits the order.
    ///
    /// Validation failures and sink failures leave the cart untouched. On
    /// success the cart is cleared and the confirmation record is saved.
    /// Every attempt gets a fresh order id.
    #[instrument(skip(self, cart, customer))]
    pub async fn place_order<S: SessionStore>(
        &self,
        cart: &mut CartService<S>,
        customer: &CustomerFields,
        payment: PaymentMode,
    ) -> Result<Confirmation, ServiceError> {
        let _guard = self.begin_submission()?;

        let BuiltOrder { order, advisory } = self
            .orders
            .build_order(cart.cart(), customer, payment, Local::now())?;
        let ticket = self.ticket(&order);
        let submission = OrderSubmission::new(&order, ticket.clone())?;

        if let Err(e) = self.sink.submit(&submission).await {
            warn!(order_id = %order.id, error = %e, "Order not sent, cart kept");
            return Err(e);
        }

        let phone = self.orders.settings().phone.clone();
        if let Err(e) = cart.clear() {
            error!(
                order_id = %order.id,
                error = %e,
                "Order sent but the cart could not be cleared"
            );
        }
        let last = LastOrder::from_order(&order, &phone);
        if let Err(e) = save_json(cart.store(), LAST_ORDER_KEY, &last) {
            error!(order_id = %order.id, error = %e, "Failed to save confirmation record");
        }

        let payment_links = match order.payment {
            PaymentMode::Online => self.orders.settings().payment_links().cloned().collect(),
            PaymentMode::PayAtPickup => Vec::new(),
        };

        info!(order_id = %order.id, total = %order.total, "Order placed");
        Ok(Confirmation {
            message: confirmation_message(&order, &phone),
            order,
            advisory,
            ticket,
            payment_links,
        })
    }

    fn ticket(&self, order: &Order) -> String {
        render_kitchen_ticket(order, &self.catalog, &self.orders.settings().store_name)
    }

    fn begin_submission(&self) -> Result<SubmissionGuard, ServiceError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ServiceError::SubmissionInProgress)?;
        Ok(SubmissionGuard(Arc::clone(&self.in_flight)))
    }
}

/// Releases the submission slot when dropped.
struct SubmissionGuard(Arc<AtomicBool>);

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reads the confirmation record of the last submitted order.
pub fn last_order<S>(store: &S) -> Result<Option<LastOrder>, ServiceError>
where
    S: SessionStore + ?Sized,
{
    load_json(store, LAST_ORDER_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::StoreSettings;
    use crate::models::item::{ItemDetails, LineItem};
    use crate::session::MemorySessionStore;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        received: Mutex<Vec<OrderSubmission>>,
    }

    #[async_trait]
    impl OrderSink for RecordingSink {
        async fn submit(&self, submission: &OrderSubmission) -> Result<(), ServiceError> {
            self.received.lock().unwrap().push(submission.clone());
            if self.fail {
                Err(ServiceError::SinkError("503".into()))
            } else {
                Ok(())
            }
        }
    }

    fn checkout(sink: Arc<RecordingSink>) -> CheckoutService {
        let orders = OrderService::new(Arc::new(StoreSettings::default()), "CAD");
        CheckoutService::new(Arc::new(Catalog::default()), Arc::new(orders), sink)
    }

    fn cart(store: MemorySessionStore) -> CartService<MemorySessionStore> {
        let mut cart = CartService::new(store, dec!(0.13));
        cart.add_item(LineItem::new(
            ItemDetails::Drink {
                drink: "cola".into(),
            },
            "Cola",
            dec!(2.25),
            2,
        ))
        .unwrap();
        cart
    }

    fn customer() -> CustomerFields {
        CustomerFields::new("Ada", "519-555-0101")
    }

    #[tokio::test]
    async fn test_success_clears_cart_and_saves_last_order() {
        let sink = Arc::new(RecordingSink::default());
        let store = MemorySessionStore::new();
        let mut cart = cart(store.clone());

        let confirmation = checkout(sink.clone())
            .place_order(&mut cart, &customer(), PaymentMode::PayAtPickup)
            .await
            .unwrap();

        assert!(cart.cart().is_empty());
        assert!(confirmation.message.starts_with("Order SP-"));
        assert!(confirmation.ticket.contains("2× Cola"));
        assert_eq!(sink.received.lock().unwrap().len(), 1);

        let last = last_order(&store).unwrap().unwrap();
        assert_eq!(last.id, confirmation.order.id);
        assert_eq!(last.totals.subtotal, dec!(4.50));
        assert_eq!(last.phone, "226-648-8888");
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_cart() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let store = MemorySessionStore::new();
        let mut cart = cart(store.clone());
        let service = checkout(sink);

        let err = service
            .place_order(&mut cart, &customer(), PaymentMode::PayAtPickup)
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::SinkError(_));
        assert_eq!(cart.cart().len(), 1);
        assert!(last_order(&store).unwrap().is_none());
        assert!(!service.is_submitting());
    }

    #[tokio::test]
    async fn test_validation_failure_sends_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let mut cart = cart(MemorySessionStore::new());

        let err = checkout(sink.clone())
            .place_order(
                &mut cart,
                &CustomerFields::new("A", "519-555-0101"),
                PaymentMode::PayAtPickup,
            )
            .await
            .unwrap_err();

        assert_matches!(err, ServiceError::ValidationError { .. });
        assert!(sink.received.lock().unwrap().is_empty());
        assert_eq!(cart.cart().len(), 1);
    }

    #[test]
    fn test_preview_does_not_submit() {
        let sink = Arc::new(RecordingSink::default());
        let cart = cart(MemorySessionStore::new());

        let preview = checkout(sink.clone())
            .preview(&cart, &customer(), PaymentMode::Online)
            .unwrap();

        assert_eq!(preview.built.advisory, Some(Advisory::PaymentDowngraded));
        assert!(preview.ticket.contains("(Pay at Pickup)"));
        assert!(sink.received.lock().unwrap().is_empty());
    }
}
