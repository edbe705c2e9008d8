//! Property-based tests for pricing, cart totals and order ids.
//!
//! These tests use proptest to check the money invariants across a wide
//! range of menus, quantities and tips.

mod common;

use chrono::{Local, TimeZone};
use pizza_order::{
    common::round2,
    models::item::{ItemDetails, LineItem},
    services::commerce::{
        order_service::{is_order_id, next_order_id_with},
        pricing_service::price_single,
        Cart, TipMode,
    },
};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use rust_decimal::Decimal;

// Strategies for generating test data
fn cents_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn topping_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just("pep".to_string()),
            Just("mush".to_string()),
            Just("chicken".to_string()),
            "[a-z]{3,8}",
        ],
        0..8,
    )
}

fn tip_strategy() -> impl Strategy<Value = TipMode> {
    prop_oneof![
        (0i64..=30).prop_map(|pct| TipMode::Percent(Decimal::new(pct, 2))),
        cents_strategy().prop_map(TipMode::Fixed),
    ]
}

fn line(unit: Decimal, qty: u32) -> LineItem {
    LineItem::new(
        ItemDetails::Side {
            side: "garlic-bread".into(),
        },
        "Garlic Bread",
        unit,
        qty,
    )
}

// Property: adding a topping never lowers the pizza price
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn extra_topping_never_lowers_price(
        size in prop_oneof![Just("s"), Just("m"), Just("l"), Just("xl"), Just("zz")],
        toppings in topping_strategy(),
        extra in prop_oneof![Just("pep".to_string()), Just("chicken".to_string())],
    ) {
        let catalog = common::catalog();
        let before = price_single(&catalog, size, "white", &toppings).unwrap();
        let mut more = toppings.clone();
        more.push(extra);
        let after = price_single(&catalog, size, "white", &more).unwrap();
        prop_assert!(after > before, "{} !> {}", after, before);
    }

    #[test]
    fn unit_prices_are_whole_cents(
        size in prop_oneof![Just("s"), Just("m"), Just("l"), Just("xl")],
        crust in prop_oneof![Just("white"), Just("ww"), Just("gf")],
        toppings in topping_strategy(),
    ) {
        let price = price_single(&common::catalog(), size, crust, &toppings).unwrap();
        prop_assert_eq!(price, round2(price));
        prop_assert!(price > Decimal::ZERO);
    }
}

// Property: totals always add up
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn totals_add_up(
        lines in prop::collection::vec((cents_strategy(), 1u32..20), 0..10),
        tax_pct in 0i64..=25,
        tip in tip_strategy(),
    ) {
        let mut cart = Cart::new(Decimal::new(tax_pct, 2));
        for (unit, qty) in &lines {
            cart.add_item(line(*unit, *qty));
        }
        match tip {
            TipMode::Percent(pct) => cart.set_tip_percent(pct, &[pct]).unwrap(),
            TipMode::Fixed(amount) => cart.set_fixed_tip(amount).unwrap(),
        }

        let totals = cart.compute_totals();
        let expected_sub: Decimal = cart.items().iter().map(|i| i.line_total).sum();
        prop_assert_eq!(totals.subtotal, expected_sub);
        prop_assert_eq!(totals.tax, round2(totals.subtotal * cart.tax_rate()));
        prop_assert_eq!(totals.total, round2(totals.subtotal + totals.tax + totals.tip));
        prop_assert!(totals.tip >= Decimal::ZERO);
        prop_assert!(cart.items().iter().all(LineItem::is_consistent));
    }

    #[test]
    fn quantity_changes_keep_lines_consistent(
        unit in cents_strategy(),
        steps in prop::collection::vec(any::<bool>(), 0..30),
    ) {
        let mut cart = Cart::new(Decimal::new(13, 2));
        cart.add_item(line(unit, 1));
        for up in steps {
            if cart.is_empty() {
                break;
            }
            if up {
                cart.increment_quantity(0).unwrap();
            } else {
                cart.decrement_quantity(0).unwrap();
            }
        }
        for item in cart.items() {
            prop_assert!(item.qty >= 1);
            prop_assert!(item.is_consistent());
        }
    }
}

// Property: order ids always match the documented pattern
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn order_ids_are_well_formed(secs in 0i64..4_000_000_000, seed in any::<u64>()) {
        let now = Local.timestamp_opt(secs, 0).single().unwrap_or_else(Local::now);
        let mut rng = StdRng::seed_from_u64(seed);
        let id = next_order_id_with(&now, &mut rng);
        prop_assert!(is_order_id(&id), "bad id {}", id);
        prop_assert_eq!(&id[3..9], now.format("%y%m%d").to_string());
    }
}
