use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError};

use crate::models::item::Family;

const DEFAULT_CURRENCY: &str = "CAD";
const DEFAULT_TAX_NAME: &str = "HST";
const DEFAULT_PHONE: &str = "226-648-8888";
const DEFAULT_STORE_NAME: &str = "Shakespeare Pizza";

/// Index of the "Large" entry a pizza size list falls back to.
pub const LARGE_SIZE_INDEX: usize = 2;

/// A pizza size and its base price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PizzaSize {
    pub id: String,
    pub label: String,
    pub base: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crust {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub upcharge: Decimal,
}

/// A topping; `weight` 2 counts as two extra toppings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topping {
    pub id: String,
    pub label: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Topping {
    pub fn is_double(&self) -> bool {
        self.weight == 2
    }
}

/// Single-pizza builder data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PizzaMenu {
    pub sizes: Vec<PizzaSize>,
    #[serde(default)]
    pub crusts: Vec<Crust>,
    #[serde(default)]
    pub toppings: Vec<Topping>,
    #[serde(default)]
    pub extra_topping_by_size: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub free_extras: Vec<String>,
}

impl PizzaMenu {
    /// Looks a size up, falling back to the Large (third) entry.
    pub fn size_or_large(&self, size_id: &str) -> Option<&PizzaSize> {
        resolve_size(&self.sizes, size_id)
    }

    pub fn crust(&self, crust_id: &str) -> Option<&Crust> {
        self.crusts.iter().find(|c| c.id == crust_id)
    }

    pub fn topping(&self, topping_id: &str) -> Option<&Topping> {
        self.toppings.iter().find(|t| t.id == topping_id)
    }

    /// Sum of topping weights; unknown ids count as 1.
    pub fn topping_weight(&self, topping_ids: &[String]) -> u32 {
        topping_weight(&self.toppings, topping_ids)
    }
}

/// Two-pizza deal data. Extra toppings are priced once for both pizzas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubleDealMenu {
    pub sizes: Vec<PizzaSize>,
    #[serde(default)]
    pub extra_topping_both_by_size: BTreeMap<String, Decimal>,
}

impl DoubleDealMenu {
    pub fn size_or_large(&self, size_id: &str) -> Option<&PizzaSize> {
        resolve_size(&self.sizes, size_id)
    }
}

/// Generic option with a flat price (sub, salad, side, drink, wing size...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedOption {
    pub id: String,
    pub label: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialItem {
    pub id: String,
    pub label: String,
    /// Flat Large price
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialsMenu {
    #[serde(default)]
    pub xl_upcharge: Decimal,
    pub items: Vec<SpecialItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsMenu {
    pub items: Vec<PricedOption>,
    #[serde(default)]
    pub extra_meat: Decimal,
    #[serde(default)]
    pub extra_cheese: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WingsMenu {
    pub sizes: Vec<PricedOption>,
    #[serde(default)]
    pub flavors: Vec<String>,
    #[serde(default)]
    pub dip_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NuggetsMenu {
    pub sizes: Vec<PricedOption>,
    #[serde(default)]
    pub dip_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaladsMenu {
    pub items: Vec<PricedOption>,
    #[serde(default)]
    pub chicken_add_on: Decimal,
}

/// Sides and drinks: a plain price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleMenu {
    pub items: Vec<PricedOption>,
}

/// The menu document. Every family section is optional; a missing section
/// only makes that family unorderable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub pizza: Option<PizzaMenu>,
    #[serde(default)]
    pub double_deal: Option<DoubleDealMenu>,
    #[serde(default)]
    pub specials: Option<SpecialsMenu>,
    #[serde(default)]
    pub subs: Option<SubsMenu>,
    #[serde(default)]
    pub wings: Option<WingsMenu>,
    #[serde(default)]
    pub nuggets: Option<NuggetsMenu>,
    #[serde(default)]
    pub salads: Option<SaladsMenu>,
    #[serde(default)]
    pub sides: Option<SimpleMenu>,
    #[serde(default)]
    pub drinks: Option<SimpleMenu>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            pizza: None,
            double_deal: None,
            specials: None,
            subs: None,
            wings: None,
            nuggets: None,
            salads: None,
            sides: None,
            drinks: None,
        }
    }
}

impl Catalog {
    /// Families that have a menu section and can be ordered.
    pub fn available_families(&self) -> Vec<Family> {
        let sections = [
            (Family::PizzaSingle, self.pizza.is_some()),
            (Family::PizzaDouble, self.double_deal.is_some()),
            (Family::Special, self.specials.is_some()),
            (Family::Sub, self.subs.is_some()),
            (Family::Wings, self.wings.is_some()),
            (Family::Nuggets, self.nuggets.is_some()),
            (Family::Salad, self.salads.is_some()),
            (Family::Side, self.sides.is_some()),
            (Family::Drink, self.drinks.is_some()),
        ];
        sections
            .into_iter()
            .filter_map(|(family, present)| present.then_some(family))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.available_families().is_empty()
    }
}

/// Finds an option by id.
pub fn find_option<'a>(options: &'a [PricedOption], id: &str) -> Option<&'a PricedOption> {
    options.iter().find(|o| o.id == id)
}

fn resolve_size<'a>(sizes: &'a [PizzaSize], size_id: &str) -> Option<&'a PizzaSize> {
    sizes
        .iter()
        .find(|s| s.id == size_id)
        .or_else(|| sizes.get(LARGE_SIZE_INDEX))
}

fn topping_weight(toppings: &[Topping], topping_ids: &[String]) -> u32 {
    topping_ids
        .iter()
        .map(|id| {
            toppings
                .iter()
                .find(|t| &t.id == id)
                .map(|t| t.weight.max(1))
                .unwrap_or(1)
        })
        .sum()
}

/// Link to an external online-payment page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentLink {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl PaymentLink {
    pub fn is_usable(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Button text: the label, or "Pay online" when none is set.
    pub fn button_label(&self) -> &str {
        self.label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or("Pay online")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettings {
    #[serde(default)]
    pub payment_links: Vec<PaymentLink>,
}

/// The store configuration document (tax, tips, contact, payment links).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    /// Tax rate as a fraction, e.g. 0.13
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: Decimal,

    #[serde(default = "default_tax_name")]
    pub tax_name: String,

    /// Offered tip percentages; empty means the built-in set
    #[serde(default)]
    #[validate(custom = "validate_tip_options")]
    pub tip_options: Vec<Decimal>,

    #[serde(default = "default_phone")]
    pub phone: String,

    #[serde(default = "default_store_name")]
    pub store_name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub clover: PaymentSettings,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            tax_name: default_tax_name(),
            tip_options: Vec::new(),
            phone: default_phone(),
            store_name: default_store_name(),
            email: None,
            clover: PaymentSettings::default(),
        }
    }
}

impl StoreSettings {
    /// Tip percentages offered to the customer.
    pub fn tip_options(&self) -> Vec<Decimal> {
        if self.tip_options.is_empty() {
            default_tip_options()
        } else {
            self.tip_options.clone()
        }
    }

    /// True when at least one payment link has a URL.
    pub fn has_online_payment(&self) -> bool {
        self.clover.payment_links.iter().any(PaymentLink::is_usable)
    }

    pub fn payment_links(&self) -> impl Iterator<Item = &PaymentLink> {
        self.clover.payment_links.iter().filter(|l| l.is_usable())
    }
}

/// Default value functions
fn default_weight() -> u32 {
    1
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_tax_rate() -> Decimal {
    dec!(0.13) // Ontario HST
}

fn default_tax_name() -> String {
    DEFAULT_TAX_NAME.to_string()
}

pub fn default_tip_options() -> Vec<Decimal> {
    vec![dec!(0), dec!(0.10), dec!(0.15), dec!(0.18), dec!(0.20)]
}

fn default_phone() -> String {
    DEFAULT_PHONE.to_string()
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("taxRate must be a fraction between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_tip_options(options: &Vec<Decimal>) -> Result<(), ValidationError> {
    if options
        .iter()
        .any(|pct| pct.is_sign_negative() || *pct > Decimal::ONE)
    {
        let mut err = ValidationError::new("tip_options");
        err.message = Some("tipOptions must be fractions between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pizza() -> PizzaMenu {
        serde_json::from_value(serde_json::json!({
            "sizes": [
                {"id": "s", "label": "Small", "base": 9.0},
                {"id": "m", "label": "Medium", "base": 11.5},
                {"id": "l", "label": "Large", "base": 14.0},
                {"id": "xl", "label": "X-Large", "base": 17.0}
            ],
            "crusts": [{"id": "white", "label": "White"}],
            "toppings": [
                {"id": "pep", "label": "Pepperoni"},
                {"id": "chicken", "label": "Chicken", "weight": 2}
            ],
            "extraToppingBySize": {"s": 1.0, "m": 1.25, "l": 1.5, "xl": 1.75}
        }))
        .expect("pizza menu should deserialize")
    }

    #[test]
    fn test_unknown_size_falls_back_to_large() {
        let menu = pizza();
        assert_eq!(menu.size_or_large("m").unwrap().label, "Medium");
        assert_eq!(menu.size_or_large("jumbo").unwrap().label, "Large");
    }

    #[test]
    fn test_topping_weight_defaults() {
        let menu = pizza();
        let ids = vec!["pep".to_string(), "chicken".to_string(), "mystery".to_string()];
        assert_eq!(menu.topping_weight(&ids), 4);
        assert_eq!(menu.topping_weight(&[]), 0);
    }

    #[test]
    fn test_crust_upcharge_defaults_to_zero() {
        let menu = pizza();
        assert_eq!(menu.crust("white").unwrap().upcharge, Decimal::ZERO);
        assert!(menu.crust("gluten-free").is_none());
    }

    #[test]
    fn test_catalog_families() {
        let catalog = Catalog {
            pizza: Some(pizza()),
            ..Default::default()
        };
        assert_eq!(catalog.available_families(), vec![Family::PizzaSingle]);
        assert!(Catalog::default().is_empty());
        assert_eq!(Catalog::default().currency, "CAD");
    }

    #[test]
    fn test_store_settings_defaults() {
        let settings: StoreSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.tax_rate, dec!(0.13));
        assert_eq!(settings.tax_name, "HST");
        assert_eq!(settings.tip_options(), default_tip_options());
        assert!(!settings.has_online_payment());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_payment_links_need_url() {
        let settings: StoreSettings = serde_json::from_value(serde_json::json!({
            "clover": {"paymentLinks": [{"label": "Pay"}, {"url": "  "}]}
        }))
        .unwrap();
        assert!(!settings.has_online_payment());

        let settings: StoreSettings = serde_json::from_value(serde_json::json!({
            "clover": {"paymentLinks": [{"label": "Pay", "url": "https://pay.example/x"}]}
        }))
        .unwrap();
        assert!(settings.has_online_payment());
        assert_eq!(settings.payment_links().count(), 1);
        assert_eq!(settings.clover.payment_links[0].button_label(), "Pay");

        let unlabeled = PaymentLink {
            label: Some(" ".into()),
            url: Some("https://pay.example/x".into()),
        };
        assert_eq!(unlabeled.button_label(), "Pay online");
    }

    #[test]
    fn test_tax_rate_validation() {
        let settings = StoreSettings {
            tax_rate: dec!(1.5),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
