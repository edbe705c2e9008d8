use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::common::round2;

/// Orderable item families.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Family {
    PizzaSingle,
    PizzaDouble,
    Special,
    Sub,
    Wings,
    Nuggets,
    Salad,
    Side,
    Drink,
}

/// Family-specific fields of a selection. Only the fields that make sense
/// for a family exist on its variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemDetails {
    PizzaSingle {
        size: String,
        crust: String,
        #[serde(default)]
        toppings: Vec<String>,
        #[serde(default)]
        free: Vec<String>,
    },
    PizzaDouble {
        size: String,
        #[serde(default)]
        toppings: Vec<String>,
        #[serde(default)]
        free: Vec<String>,
    },
    Special {
        special: String,
        #[serde(default)]
        xl: bool,
    },
    Sub {
        sub: String,
        #[serde(default, rename = "extraMeat")]
        extra_meat: bool,
        #[serde(default, rename = "extraCheese")]
        extra_cheese: bool,
    },
    Wings {
        size: String,
        flavor: String,
        #[serde(default)]
        dips: u32,
    },
    Nuggets {
        size: String,
        #[serde(default)]
        dips: u32,
    },
    Salad {
        salad: String,
        #[serde(default)]
        chicken: bool,
    },
    Side {
        side: String,
    },
    Drink {
        drink: String,
    },
}

impl ItemDetails {
    pub fn family(&self) -> Family {
        match self {
            ItemDetails::PizzaSingle { .. } => Family::PizzaSingle,
            ItemDetails::PizzaDouble { .. } => Family::PizzaDouble,
            ItemDetails::Special { .. } => Family::Special,
            ItemDetails::Sub { .. } => Family::Sub,
            ItemDetails::Wings { .. } => Family::Wings,
            ItemDetails::Nuggets { .. } => Family::Nuggets,
            ItemDetails::Salad { .. } => Family::Salad,
            ItemDetails::Side { .. } => Family::Side,
            ItemDetails::Drink { .. } => Family::Drink,
        }
    }
}

/// One add-to-cart request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(flatten)]
    pub details: ItemDetails,
    #[serde(default = "default_qty")]
    pub qty: u32,
}

impl Selection {
    pub fn new(details: ItemDetails, qty: u32) -> Self {
        Self { details, qty }
    }
}

/// A priced cart line.
///
/// `line_total` always equals `round2(unit_price * qty)` and `qty` never
/// drops below 1; a line that would reach zero is removed by the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(flatten)]
    pub details: ItemDetails,
    /// Display name, e.g. "Single Pizza — Large"
    pub name: String,
    pub qty: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl LineItem {
    pub fn new(
        details: ItemDetails,
        name: impl Into<String>,
        unit_price: Decimal,
        qty: u32,
    ) -> Self {
        let unit_price = round2(unit_price);
        let qty = qty.max(1);
        Self {
            details,
            name: name.into(),
            qty,
            unit_price,
            line_total: line_total(unit_price, qty),
        }
    }

    pub fn family(&self) -> Family {
        self.details.family()
    }

    /// Sets the quantity (minimum 1) and recomputes the line total.
    pub fn set_quantity(&mut self, qty: u32) {
        self.qty = qty.max(1);
        self.line_total = line_total(self.unit_price, self.qty);
    }

    /// True when the stored line total agrees with unit price and quantity.
    pub fn is_consistent(&self) -> bool {
        self.qty >= 1 && self.line_total == line_total(self.unit_price, self.qty)
    }
}

fn line_total(unit_price: Decimal, qty: u32) -> Decimal {
    round2(unit_price * Decimal::from(qty))
}

fn default_qty() -> u32 {
    1
}
