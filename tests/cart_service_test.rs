mod common;

use assert_matches::assert_matches;
use pizza_order::{
    errors::ServiceError,
    models::item::{ItemDetails, Selection},
    services::commerce::{CartService, PricingService, TipMode},
    session::{FileSessionStore, MemorySessionStore, SessionStore, CART_KEY},
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tempfile::TempDir;

fn pricing() -> PricingService {
    PricingService::new(Arc::new(common::catalog()))
}

fn large_two_toppings(qty: u32) -> Selection {
    Selection::new(
        ItemDetails::PizzaSingle {
            size: "l".into(),
            crust: "white".into(),
            toppings: vec!["pep".into(), "chicken".into()],
            free: vec![],
        },
        qty,
    )
}

fn cola(qty: u32) -> Selection {
    Selection::new(
        ItemDetails::Drink {
            drink: "cola".into(),
        },
        qty,
    )
}

// ==================== Totals Tests ====================

#[test]
fn test_totals_with_percent_tip() {
    let mut cart = CartService::new(MemorySessionStore::new(), dec!(0.13));
    cart.add_item(pricing().quote(&large_two_toppings(2)).unwrap())
        .unwrap();
    cart.set_tip_percent(dec!(0.18), &common::settings().tip_options())
        .unwrap();

    let totals = cart.totals();
    assert_eq!(totals.subtotal, dec!(37.00));
    assert_eq!(totals.tax, dec!(4.81));
    assert_eq!(totals.tip, dec!(6.66));
    assert_eq!(totals.total, dec!(48.47));
}

#[test]
fn test_fixed_tip_replaces_percent() {
    let mut cart = CartService::new(MemorySessionStore::new(), dec!(0.13));
    cart.add_item(pricing().quote(&cola(4)).unwrap()).unwrap();
    cart.set_tip_percent(dec!(0.20), &[]).unwrap();
    cart.set_fixed_tip(dec!(2)).unwrap();

    assert_eq!(cart.cart().tip(), TipMode::Fixed(dec!(2)));
    let totals = cart.totals();
    assert_eq!(totals.subtotal, dec!(7.00));
    assert_eq!(totals.tip, dec!(2.00));
    assert_eq!(totals.total, dec!(9.91));
}

#[test]
fn test_tip_outside_offered_options_is_rejected() {
    let mut cart = CartService::new(MemorySessionStore::new(), dec!(0.13));
    let err = cart
        .set_tip_percent(dec!(0.50), &common::settings().tip_options())
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTip(_));
    assert_eq!(cart.cart().tip(), TipMode::default());
}

// ==================== Quantity Tests ====================

#[test]
fn test_quantity_changes_and_removal() {
    let mut cart = CartService::new(MemorySessionStore::new(), dec!(0.13));
    let index = cart.add_item(pricing().quote(&cola(1)).unwrap()).unwrap();

    cart.increment_quantity(index).unwrap();
    assert_eq!(cart.cart().items()[0].qty, 2);
    assert_eq!(cart.cart().items()[0].line_total, dec!(3.50));

    cart.decrement_quantity(index).unwrap();
    cart.decrement_quantity(index).unwrap();
    assert!(cart.cart().is_empty());

    assert_matches!(
        cart.remove_item(0).unwrap_err(),
        ServiceError::InvalidIndex(0)
    );
}

#[test]
fn test_clear_resets_items_and_tip() {
    let mut cart = CartService::new(MemorySessionStore::new(), dec!(0.13));
    cart.add_item(pricing().quote(&cola(2)).unwrap()).unwrap();
    cart.set_fixed_tip(dec!(1.50)).unwrap();

    cart.clear().unwrap();

    assert!(cart.cart().is_empty());
    assert_eq!(cart.totals().total, dec!(0));
}

// ==================== Persistence Tests ====================

#[test]
fn test_cart_survives_restart_with_file_store() {
    let dir = TempDir::new().unwrap();
    {
        let store = FileSessionStore::open(dir.path()).unwrap();
        let mut cart = CartService::new(store, dec!(0.13));
        cart.add_item(pricing().quote(&large_two_toppings(2)).unwrap())
            .unwrap();
        cart.set_tip_percent(dec!(0.15), &[]).unwrap();
    }

    let store = FileSessionStore::open(dir.path()).unwrap();
    let restored = CartService::restore(store, dec!(0.13), &[]);

    assert_eq!(restored.cart().len(), 1);
    assert_eq!(restored.cart().items()[0].line_total, dec!(37.00));
    assert_eq!(restored.cart().tip(), TipMode::Percent(dec!(0.15)));
}

#[test]
fn test_corrupt_cart_restores_empty() {
    let store = MemorySessionStore::new();
    store.set(CART_KEY, "{not json").unwrap();

    let cart = CartService::restore(store, dec!(0.13), &[]);

    assert!(cart.cart().is_empty());
    assert_eq!(cart.cart().tax_rate(), dec!(0.13));
}

#[test]
fn test_restore_uses_current_tax_rate() {
    let store = MemorySessionStore::new();
    {
        let mut cart = CartService::new(store.clone(), dec!(0.05));
        cart.add_item(pricing().quote(&cola(2)).unwrap()).unwrap();
    }

    let cart = CartService::restore(store, dec!(0.13), &[]);
    assert_eq!(cart.cart().tax_rate(), dec!(0.13));
    assert_eq!(cart.totals().tax, dec!(0.46));
}

#[test]
fn test_oversized_saved_tip_is_reset_on_restart() {
    let dir = TempDir::new().unwrap();
    {
        let store = FileSessionStore::open(dir.path()).unwrap();
        let mut cart = CartService::new(store, dec!(0.13));
        cart.add_item(pricing().quote(&cola(1)).unwrap()).unwrap();
        assert_matches!(
            cart.set_fixed_tip(dec!(5000)),
            Err(ServiceError::InvalidTip(_))
        );
    }
    let store = FileSessionStore::open(dir.path()).unwrap();
    let saved = store.get(CART_KEY).unwrap().unwrap();
    let tampered = saved.replace(
        r#""tip":{"mode":"percent","value":"0"}"#,
        r#""tip":{"mode":"fixed","value":"79228162514264337593543950335"}"#,
    );
    assert_ne!(saved, tampered);
    store.set(CART_KEY, &tampered).unwrap();

    let cart = CartService::restore(store, dec!(0.13), &common::settings().tip_options());

    assert_eq!(cart.cart().len(), 1);
    assert_eq!(cart.cart().tip(), TipMode::default());
    assert_eq!(cart.totals().total, dec!(1.98));
}
