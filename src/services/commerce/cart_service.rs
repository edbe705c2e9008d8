use crate::{
    common::{percent_label, round2},
    errors::ServiceError,
    models::catalog::default_tip_options,
    models::item::LineItem,
    models::order::Totals,
    session::{load_json, save_json, SessionStore, CART_KEY},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Largest fixed tip accepted.
pub const MAX_FIXED_TIP: Decimal = dec!(1000);

/// How the tip is derived. The two modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum TipMode {
    /// Fraction of the subtotal, e.g. 0.18
    Percent(Decimal),
    /// Flat amount
    Fixed(Decimal),
}

impl Default for TipMode {
    fn default() -> Self {
        TipMode::Percent(Decimal::ZERO)
    }
}

/// Button label for a tip option: "No tip" or "18%".
pub fn tip_label(pct: Decimal) -> String {
    if pct.is_zero() {
        "No tip".to_string()
    } else {
        format!("{}%", percent_label(pct))
    }
}

/// Session cart state: line items in insertion order plus tip and tax.
///
/// Totals are never stored; `compute_totals` derives them on every call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default)]
    tip: TipMode,
    #[serde(default)]
    tax_rate: Decimal,
}

impl Cart {
    pub fn new(tax_rate: Decimal) -> Self {
        Self {
            tax_rate,
            ..Default::default()
        }
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn tip(&self) -> TipMode {
        self.tip
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn set_tax_rate(&mut self, tax_rate: Decimal) {
        self.tax_rate = tax_rate;
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Appends a line. Identical selections are not merged.
    pub fn add_item(&mut self, line: LineItem) -> usize {
        self.items.push(line);
        self.items.len() - 1
    }

    pub fn increment_quantity(&mut self, index: usize) -> Result<(), ServiceError> {
        let line = self.line_mut(index)?;
        let qty = line.qty.saturating_add(1);
        line.set_quantity(qty);
        Ok(())
    }

    /// Lowers the quantity by one; a line at quantity 1 is removed.
    pub fn decrement_quantity(&mut self, index: usize) -> Result<(), ServiceError> {
        let qty = self.line_mut(index)?.qty;
        if qty <= 1 {
            self.items.remove(index);
        } else {
            self.items[index].set_quantity(qty - 1);
        }
        Ok(())
    }

    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, ServiceError> {
        if index >= self.items.len() {
            return Err(ServiceError::InvalidIndex(index));
        }
        Ok(self.items.remove(index))
    }

    /// Switches to a percentage tip. `allowed` is the offered set; an empty
    /// set means the built-in options.
    pub fn set_tip_percent(
        &mut self,
        pct: Decimal,
        allowed: &[Decimal],
    ) -> Result<(), ServiceError> {
        if !offered_tips(allowed).contains(&pct) {
            return Err(ServiceError::InvalidTip(format!(
                "{} is not one of the offered tip options",
                pct
            )));
        }
        self.tip = TipMode::Percent(pct);
        Ok(())
    }

    pub fn set_fixed_tip(&mut self, amount: Decimal) -> Result<(), ServiceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ServiceError::InvalidTip("tip cannot be negative".to_string()));
        }
        if amount > MAX_FIXED_TIP {
            return Err(ServiceError::InvalidTip(format!(
                "tip cannot exceed {}",
                MAX_FIXED_TIP
            )));
        }
        self.tip = TipMode::Fixed(round2(amount));
        Ok(())
    }

    pub fn clear_tip(&mut self) {
        self.tip = TipMode::Percent(Decimal::ZERO);
    }

    /// Empties the cart and resets the tip. The tax rate is kept.
    pub fn clear(&mut self) {
        self.items.clear();
        self.clear_tip();
    }

    /// Derives the totals. Arithmetic saturates instead of overflowing.
    pub fn compute_totals(&self) -> Totals {
        let subtotal = self
            .items
            .iter()
            .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.line_total));
        let tip = match self.tip {
            TipMode::Percent(pct) => round2(subtotal.saturating_mul(pct)),
            TipMode::Fixed(amount) => round2(amount),
        };
        let tax = round2(subtotal.saturating_mul(self.tax_rate));
        Totals {
            subtotal,
            tax,
            tip,
            total: round2(subtotal.saturating_add(tax).saturating_add(tip)),
        }
    }

    /// Brings a restored cart back within the current rules: empty lines are
    /// dropped, unit prices rounded to cents, line totals recomputed and a tip
    /// that could not be chosen today is reset.
    fn repair(&mut self, tip_options: &[Decimal]) {
        self.items.retain(|line| line.qty >= 1);
        for line in &mut self.items {
            let qty = line.qty;
            line.unit_price = round2(line.unit_price);
            line.set_quantity(qty);
        }
        if !tip_allowed(self.tip, tip_options) {
            warn!(tip = ?self.tip, "Resetting saved tip outside the offered options");
            self.clear_tip();
        }
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut LineItem, ServiceError> {
        self.items
            .get_mut(index)
            .ok_or(ServiceError::InvalidIndex(index))
    }
}

fn offered_tips(allowed: &[Decimal]) -> Vec<Decimal> {
    if allowed.is_empty() {
        default_tip_options()
    } else {
        allowed.to_vec()
    }
}

fn tip_allowed(tip: TipMode, allowed: &[Decimal]) -> bool {
    match tip {
        TipMode::Percent(pct) => pct.is_zero() || offered_tips(allowed).contains(&pct),
        TipMode::Fixed(amount) => {
            (amount.is_zero() || amount.is_sign_positive()) && amount <= MAX_FIXED_TIP
        }
    }
}

/// Owns the session cart and keeps it persisted.
///
/// Every mutation is applied to a copy, written to the session store and
/// only then committed; a failed write leaves the cart unchanged.
pub struct CartService<S: SessionStore> {
    cart: Cart,
    store: S,
}

impl<S: SessionStore> CartService<S> {
    /// Starts with an empty cart without reading the store.
    pub fn new(store: S, tax_rate: Decimal) -> Self {
        Self {
            cart: Cart::new(tax_rate),
            store,
        }
    }

    /// Restores the cart saved in the session. Missing or unreadable state
    /// yields an empty cart. The tax rate and the offered tips always come
    /// from current settings; an empty `tip_options` means the built-in set.
    #[instrument(skip(store, tip_options))]
    pub fn restore(store: S, tax_rate: Decimal, tip_options: &[Decimal]) -> Self {
        let cart = match load_json::<Cart, _>(&store, CART_KEY) {
            Ok(Some(mut cart)) => {
                cart.set_tax_rate(tax_rate);
                cart.repair(tip_options);
                debug!(lines = cart.len(), "Restored session cart");
                cart
            }
            Ok(None) => Cart::new(tax_rate),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session cart");
                Cart::new(tax_rate)
            }
        };
        Self { cart, store }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn totals(&self) -> Totals {
        self.cart.compute_totals()
    }

    #[instrument(skip(self, line), fields(name = %line.name, qty = line.qty))]
    pub fn add_item(&mut self, line: LineItem) -> Result<usize, ServiceError> {
        let index = self.mutate(|cart| Ok(cart.add_item(line)))?;
        info!(index, "Added to cart");
        Ok(index)
    }

    pub fn increment_quantity(&mut self, index: usize) -> Result<(), ServiceError> {
        self.mutate(|cart| cart.increment_quantity(index))
    }

    pub fn decrement_quantity(&mut self, index: usize) -> Result<(), ServiceError> {
        self.mutate(|cart| cart.decrement_quantity(index))
    }

    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, ServiceError> {
        self.mutate(|cart| cart.remove_item(index))
    }

    pub fn set_tip_percent(
        &mut self,
        pct: Decimal,
        allowed: &[Decimal],
    ) -> Result<(), ServiceError> {
        self.mutate(|cart| cart.set_tip_percent(pct, allowed))
    }

    pub fn set_fixed_tip(&mut self, amount: Decimal) -> Result<(), ServiceError> {
        self.mutate(|cart| cart.set_fixed_tip(amount))
    }

    pub fn clear_tip(&mut self) -> Result<(), ServiceError> {
        self.mutate(|cart| {
            cart.clear_tip();
            Ok(())
        })
    }

    #[instrument(skip(self))]
    pub fn clear(&mut self) -> Result<(), ServiceError> {
        self.mutate(|cart| {
            cart.clear();
            Ok(())
        })
    }

    fn mutate<T, F>(&mut self, apply: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Cart) -> Result<T, ServiceError>,
    {
        let mut next = self.cart.clone();
        let out = apply(&mut next)?;
        save_json(&self.store, CART_KEY, &next)?;
        self.cart = next;
        Ok(out)
    }
}
