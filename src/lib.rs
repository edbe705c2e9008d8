//! Pizza Order Library
//!
//! Pricing engine, session cart and pickup-order assembly for a single
//! pizzeria ordering form.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod common;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod session;

pub use errors::ServiceError;
pub use models::{
    Advisory, BuiltOrder, Catalog, CustomerFields, Family, ItemDetails, LastOrder, LineItem,
    Order, PaymentMode, Selection, StoreSettings, Totals,
};
pub use services::commerce::{
    Cart, CartService, CatalogService, CheckoutService, Confirmation, HttpOrderSink, LoadOutcome,
    OrderService, OrderSink, OrderSubmission, PricingService, TipMode,
};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
