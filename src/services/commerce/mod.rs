/// Commerce services module - menu, pricing, cart and pickup-order flow
pub mod cart_service;
pub mod catalog_service;
pub mod checkout_service;
pub mod order_service;
pub mod pricing_service;
pub mod submission_service;
pub mod ticket_service;

// Re-export services for convenience
pub use cart_service::{Cart, CartService, TipMode};
pub use catalog_service::{CatalogService, LoadOutcome};
pub use checkout_service::{CheckoutService, Confirmation, OrderPreview};
pub use order_service::OrderService;
pub use pricing_service::PricingService;
pub use submission_service::{HttpOrderSink, OrderSink, OrderSubmission};
