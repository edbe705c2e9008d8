//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use pizza_order::{
    errors::ServiceError,
    models::catalog::{Catalog, StoreSettings},
    services::commerce::{
        catalog_service::{parse_catalog, parse_settings},
        OrderService, OrderSink, OrderSubmission,
    },
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A full menu document covering every family.
pub fn menu_json() -> Value {
    json!({
        "currency": "CAD",
        "pizza": {
            "sizes": [
                {"id": "s", "label": "Small", "base": 9.00},
                {"id": "m", "label": "Medium", "base": 11.50},
                {"id": "l", "label": "Large", "base": 14.00},
                {"id": "xl", "label": "X-Large", "base": 17.00}
            ],
            "crusts": [
                {"id": "white", "label": "White", "upcharge": 0},
                {"id": "ww", "label": "Whole Wheat", "upcharge": 1.00},
                {"id": "gf", "label": "Gluten Free", "upcharge": 3.00}
            ],
            "toppings": [
                {"id": "pep", "label": "Pepperoni", "weight": 1},
                {"id": "mush", "label": "Mushrooms", "weight": 1},
                {"id": "chicken", "label": "Grilled Chicken", "weight": 2}
            ],
            "extraToppingBySize": {"s": 1.00, "m": 1.25, "l": 1.50, "xl": 1.75},
            "freeExtras": ["Oregano", "Garlic"]
        },
        "doubleDeal": {
            "sizes": [
                {"id": "m", "label": "Medium", "base": 21.00},
                {"id": "l", "label": "Large", "base": 25.00},
                {"id": "xl", "label": "X-Large", "base": 30.00}
            ],
            "extraToppingBothBySize": {"m": 2.00, "l": 2.50, "xl": 3.00}
        },
        "specials": {
            "xlUpcharge": 3.00,
            "items": [
                {"id": "hawaiian", "label": "Hawaiian", "price": 17.99},
                {"id": "meat", "label": "Meat Lovers", "price": 19.99}
            ]
        },
        "subs": {
            "items": [{"id": "italian", "label": "Italian", "price": 10.50}],
            "extraMeat": 2.00,
            "extraCheese": 1.00
        },
        "wings": {
            "sizes": [
                {"id": "w10", "label": "10 pc", "price": 13.99},
                {"id": "w20", "label": "20 pc", "price": 25.99}
            ],
            "flavors": ["Hot", "BBQ", "Honey Garlic"],
            "dipPrice": 1.25
        },
        "nuggets": {
            "sizes": [{"id": "n10", "label": "10 pc", "price": 9.99}],
            "dipPrice": 1.00
        },
        "salads": {
            "items": [{"id": "caesar", "label": "Caesar Salad", "price": 8.99}],
            "chickenAddOn": 3.50
        },
        "sides": {
            "items": [{"id": "garlic-bread", "label": "Garlic Bread", "price": 5.49}]
        },
        "drinks": {
            "items": [{"id": "cola", "label": "Cola (355 ml)", "price": 1.75}]
        }
    })
}

pub fn catalog() -> Catalog {
    parse_catalog(&menu_json().to_string()).expect("fixture menu should parse")
}

/// Store settings without any payment link.
pub fn settings() -> StoreSettings {
    parse_settings(
        &json!({
            "taxRate": 0.13,
            "taxName": "HST",
            "tipOptions": [0, 0.10, 0.15, 0.18, 0.20],
            "phone": "226-648-8888",
            "storeName": "Shakespeare Pizza"
        })
        .to_string(),
    )
    .expect("fixture settings should parse")
}

pub fn settings_with_payment_link() -> StoreSettings {
    let mut settings = settings();
    settings.clover.payment_links = vec![pizza_order::models::catalog::PaymentLink {
        label: Some("Pay now".into()),
        url: Some("https://pay.example.com/sp".into()),
    }];
    settings
}

pub fn order_service(settings: StoreSettings) -> Arc<OrderService> {
    Arc::new(OrderService::new(Arc::new(settings), "CAD"))
}

/// Sink that records every submission and optionally fails or stalls.
#[derive(Default)]
pub struct RecordingSink {
    pub fail: bool,
    pub delay: Option<Duration>,
    pub received: Mutex<Vec<OrderSubmission>>,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderSink for RecordingSink {
    async fn submit(&self, submission: &OrderSubmission) -> Result<(), ServiceError> {
        self.received.lock().unwrap().push(submission.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            Err(ServiceError::SinkError("order sink responded with 503".into()))
        } else {
            Ok(())
        }
    }
}
