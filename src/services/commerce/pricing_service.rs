use crate::{
    common::round2,
    errors::ServiceError,
    models::catalog::{find_option, Catalog, PizzaSize, PricedOption, WingsMenu},
    models::item::{Family, ItemDetails, LineItem, Selection},
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Unit price of a single pizza.
///
/// An unknown size is priced as the third ("Large") size, an unknown crust
/// adds nothing and an unknown topping counts with weight 1. The per-topping
/// price is looked up for the size actually used.
pub fn price_single(
    catalog: &Catalog,
    size_id: &str,
    crust_id: &str,
    topping_ids: &[String],
) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .pizza
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::PizzaSingle))?;
    let size = menu
        .size_or_large(size_id)
        .ok_or(ServiceError::FamilyUnavailable(Family::PizzaSingle))?;

    let per_topping = menu
        .extra_topping_by_size
        .get(&size.id)
        .copied()
        .unwrap_or(Decimal::ZERO);
    let weight = Decimal::from(menu.topping_weight(topping_ids));
    let upcharge = menu
        .crust(crust_id)
        .map(|c| c.upcharge)
        .unwrap_or(Decimal::ZERO);

    Ok(round2(size.base + weight * per_topping + upcharge))
}

/// Unit price of a double deal (two pizzas). The per-topping price already
/// covers both pizzas.
pub fn price_double(
    catalog: &Catalog,
    size_id: &str,
    topping_ids: &[String],
) -> Result<Decimal, ServiceError> {
    let size = double_size(catalog, size_id)?;
    let menu = catalog
        .double_deal
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::PizzaDouble))?;

    let per_topping = menu
        .extra_topping_both_by_size
        .get(&size.id)
        .copied()
        .unwrap_or(Decimal::ZERO);
    let weight = match &catalog.pizza {
        Some(pizza) => pizza.topping_weight(topping_ids),
        None => topping_ids.len() as u32,
    };

    Ok(round2(size.base + Decimal::from(weight) * per_topping))
}

pub fn price_special(
    catalog: &Catalog,
    special_id: &str,
    upgrade_to_xl: bool,
) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .specials
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::Special))?;
    let item = menu
        .items
        .iter()
        .find(|s| s.id == special_id)
        .ok_or_else(|| unknown(Family::Special, special_id))?;

    let upcharge = if upgrade_to_xl {
        menu.xl_upcharge
    } else {
        Decimal::ZERO
    };
    Ok(round2(item.price + upcharge))
}

pub fn price_sub(
    catalog: &Catalog,
    sub_id: &str,
    extra_meat: bool,
    extra_cheese: bool,
) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .subs
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::Sub))?;
    let item = option(&menu.items, Family::Sub, sub_id)?;

    let mut price = item.price;
    if extra_meat {
        price += menu.extra_meat;
    }
    if extra_cheese {
        price += menu.extra_cheese;
    }
    Ok(round2(price))
}

pub fn price_wings(
    catalog: &Catalog,
    size_id: &str,
    flavor: &str,
    dips: u32,
) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .wings
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::Wings))?;
    let size = option(&menu.sizes, Family::Wings, size_id)?;
    wings_flavor(menu, flavor)?;
    Ok(round2(size.price + Decimal::from(dips) * menu.dip_price))
}

/// Resolves a flavor against the menu's list, ignoring ASCII case. A menu
/// without flavors accepts any text.
fn wings_flavor<'a>(menu: &'a WingsMenu, flavor: &'a str) -> Result<&'a str, ServiceError> {
    let flavor = flavor.trim();
    if menu.flavors.is_empty() {
        return Ok(flavor);
    }
    menu.flavors
        .iter()
        .find(|f| f.trim().eq_ignore_ascii_case(flavor))
        .map(|f| f.trim())
        .ok_or_else(|| unknown(Family::Wings, flavor))
}

pub fn price_nuggets(
    catalog: &Catalog,
    size_id: &str,
    dips: u32,
) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .nuggets
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::Nuggets))?;
    let size = option(&menu.sizes, Family::Nuggets, size_id)?;
    Ok(round2(size.price + Decimal::from(dips) * menu.dip_price))
}

pub fn price_salad(
    catalog: &Catalog,
    salad_id: &str,
    chicken: bool,
) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .salads
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::Salad))?;
    let item = option(&menu.items, Family::Salad, salad_id)?;
    let add_on = if chicken {
        menu.chicken_add_on
    } else {
        Decimal::ZERO
    };
    Ok(round2(item.price + add_on))
}

pub fn price_side(catalog: &Catalog, side_id: &str) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .sides
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::Side))?;
    Ok(round2(option(&menu.items, Family::Side, side_id)?.price))
}

pub fn price_drink(catalog: &Catalog, drink_id: &str) -> Result<Decimal, ServiceError> {
    let menu = catalog
        .drinks
        .as_ref()
        .ok_or(ServiceError::FamilyUnavailable(Family::Drink))?;
    Ok(round2(option(&menu.items, Family::Drink, drink_id)?.price))
}

/// Unit price for any selection.
pub fn price_selection(catalog: &Catalog, details: &ItemDetails) -> Result<Decimal, ServiceError> {
    match details {
        ItemDetails::PizzaSingle {
            size,
            crust,
            toppings,
            ..
        } => price_single(catalog, size, crust, toppings),
        ItemDetails::PizzaDouble { size, toppings, .. } => price_double(catalog, size, toppings),
        ItemDetails::Special { special, xl } => price_special(catalog, special, *xl),
        ItemDetails::Sub {
            sub,
            extra_meat,
            extra_cheese,
        } => price_sub(catalog, sub, *extra_meat, *extra_cheese),
        ItemDetails::Wings { size, flavor, dips } => {
            price_wings(catalog, size, flavor, *dips)
        }
        ItemDetails::Nuggets { size, dips } => price_nuggets(catalog, size, *dips),
        ItemDetails::Salad { salad, chicken } => price_salad(catalog, salad, *chicken),
        ItemDetails::Side { side } => price_side(catalog, side),
        ItemDetails::Drink { drink } => price_drink(catalog, drink),
    }
}

/// Name shown in the cart and on the confirmation, e.g. "Single Pizza — Large".
pub fn display_name(catalog: &Catalog, details: &ItemDetails) -> Result<String, ServiceError> {
    let name = match details {
        ItemDetails::PizzaSingle { size, .. } => {
            format!("Single Pizza — {}", single_size(catalog, size)?.label)
        }
        ItemDetails::PizzaDouble { size, .. } => {
            format!("Double Deal — {}", double_size(catalog, size)?.label)
        }
        ItemDetails::Special { special, xl } => {
            let menu = catalog
                .specials
                .as_ref()
                .ok_or(ServiceError::FamilyUnavailable(Family::Special))?;
            let item = menu
                .items
                .iter()
                .find(|s| &s.id == special)
                .ok_or_else(|| unknown(Family::Special, special))?;
            if *xl {
                format!("{} (XL)", item.label)
            } else {
                item.label.clone()
            }
        }
        ItemDetails::Sub { sub, .. } => {
            let menu = catalog
                .subs
                .as_ref()
                .ok_or(ServiceError::FamilyUnavailable(Family::Sub))?;
            format!("{} Sub", option(&menu.items, Family::Sub, sub)?.label)
        }
        ItemDetails::Wings { size, flavor, .. } => {
            let menu = catalog
                .wings
                .as_ref()
                .ok_or(ServiceError::FamilyUnavailable(Family::Wings))?;
            let size = option(&menu.sizes, Family::Wings, size)?;
            format!("Wings — {} {}", size.label, wings_flavor(menu, flavor)?)
                .trim_end()
                .to_string()
        }
        ItemDetails::Nuggets { size, .. } => {
            let menu = catalog
                .nuggets
                .as_ref()
                .ok_or(ServiceError::FamilyUnavailable(Family::Nuggets))?;
            format!(
                "Nuggets — {}",
                option(&menu.sizes, Family::Nuggets, size)?.label
            )
        }
        ItemDetails::Salad { salad, .. } => {
            let menu = catalog
                .salads
                .as_ref()
                .ok_or(ServiceError::FamilyUnavailable(Family::Salad))?;
            option(&menu.items, Family::Salad, salad)?.label.clone()
        }
        ItemDetails::Side { side } => {
            let menu = catalog
                .sides
                .as_ref()
                .ok_or(ServiceError::FamilyUnavailable(Family::Side))?;
            option(&menu.items, Family::Side, side)?.label.clone()
        }
        ItemDetails::Drink { drink } => {
            let menu = catalog
                .drinks
                .as_ref()
                .ok_or(ServiceError::FamilyUnavailable(Family::Drink))?;
            option(&menu.items, Family::Drink, drink)?.label.clone()
        }
    };
    Ok(name)
}

/// Prices a selection into a cart line. Quantity is clamped to at least 1.
pub fn line_item(
    catalog: &Catalog,
    details: ItemDetails,
    qty: u32,
) -> Result<LineItem, ServiceError> {
    let unit_price = price_selection(catalog, &details)?;
    let name = display_name(catalog, &details)?;
    Ok(LineItem::new(details, name, unit_price, qty))
}

fn single_size<'a>(catalog: &'a Catalog, size_id: &str) -> Result<&'a PizzaSize, ServiceError> {
    catalog
        .pizza
        .as_ref()
        .and_then(|menu| menu.size_or_large(size_id))
        .ok_or(ServiceError::FamilyUnavailable(Family::PizzaSingle))
}

fn double_size<'a>(catalog: &'a Catalog, size_id: &str) -> Result<&'a PizzaSize, ServiceError> {
    catalog
        .double_deal
        .as_ref()
        .and_then(|menu| menu.size_or_large(size_id))
        .ok_or(ServiceError::FamilyUnavailable(Family::PizzaDouble))
}

fn option<'a>(
    options: &'a [PricedOption],
    family: Family,
    id: &str,
) -> Result<&'a PricedOption, ServiceError> {
    find_option(options, id).ok_or_else(|| unknown(family, id))
}

fn unknown(family: Family, id: &str) -> ServiceError {
    ServiceError::UnknownOption {
        family,
        id: id.to_string(),
    }
}

/// Catalog-bound pricing used by the cart front end.
#[derive(Debug, Clone)]
pub struct PricingService {
    catalog: Arc<Catalog>,
}

impl PricingService {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Live price preview for the builder: unit price times quantity.
    pub fn preview(&self, selection: &Selection) -> Result<Decimal, ServiceError> {
        let unit = price_selection(&self.catalog, &selection.details)?;
        Ok(round2(unit * Decimal::from(selection.qty.max(1))))
    }

    /// Prices a selection into a line item ready for the cart.
    #[instrument(skip(self, selection), fields(family = %selection.details.family()))]
    pub fn quote(&self, selection: &Selection) -> Result<LineItem, ServiceError> {
        let line = line_item(&self.catalog, selection.details.clone(), selection.qty)?;
        debug!(
            name = %line.name,
            unit_price = %line.unit_price,
            qty = line.qty,
            "Priced selection"
        );
        Ok(line)
    }
}
