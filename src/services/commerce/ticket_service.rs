use crate::{
    common::{format_money, percent_label},
    models::catalog::{Catalog, PizzaSize},
    models::item::{ItemDetails, LineItem},
    models::order::Order,
};

const NO_TOPPINGS: &str = "Cheese";
const INDENT: &str = "   ";

/// Plain-text ticket for kitchen staff. Labels are resolved through the
/// catalog; ids with no catalog entry are printed as-is.
pub fn render_kitchen_ticket(order: &Order, catalog: &Catalog, store_name: &str) -> String {
    let money = |amount| format_money(amount, &order.currency);
    let mut lines = Vec::with_capacity(order.items.len() + 6);

    lines.push(format!(
        "{} — NEW PICKUP ORDER {}  ({})",
        store_name,
        order.id,
        order.payment.label()
    ));
    lines.push(format!(
        "Name: {}   Phone: {}   Pickup: {}",
        order.customer.name, order.customer.phone, order.customer.pickup
    ));
    if !order.customer.notes.is_empty() {
        lines.push(format!("Notes: {}", order.customer.notes));
    }
    lines.push(String::new());

    for item in &order.items {
        lines.push(ticket_entry(item, catalog));
    }

    lines.push(String::new());
    lines.push(format!(
        "Subtotal: {}   {} {}%: {}   Tip: {}",
        money(order.sub_total),
        order.tax_name,
        percent_label(order.tax_rate),
        money(order.tax),
        money(order.tip)
    ));
    lines.push(format!("TOTAL: {}", money(order.total)));
    lines.join("\n")
}

fn ticket_entry(item: &LineItem, catalog: &Catalog) -> String {
    match &item.details {
        ItemDetails::PizzaSingle {
            size,
            crust,
            toppings,
            free,
        } => {
            let size_label = catalog
                .pizza
                .as_ref()
                .and_then(|p| find_size(&p.sizes, size))
                .unwrap_or(size.as_str());
            let crust_label = catalog
                .pizza
                .as_ref()
                .and_then(|p| p.crust(crust))
                .map(|c| c.label.as_str())
                .unwrap_or(crust.as_str());
            format!(
                "{}× {} Single Pizza — {}\n{}Toppings: {}{}",
                item.qty,
                size_label,
                crust_label,
                INDENT,
                topping_list(catalog, toppings),
                free_line(free)
            )
        }
        ItemDetails::PizzaDouble {
            size,
            toppings,
            free,
        } => {
            let size_label = catalog
                .double_deal
                .as_ref()
                .and_then(|d| find_size(&d.sizes, size))
                .unwrap_or(size.as_str());
            format!(
                "{}× {} Double Deal\n{}Toppings (both pizzas): {}{}",
                item.qty,
                size_label,
                INDENT,
                topping_list(catalog, toppings),
                free_line(free)
            )
        }
        other => match add_ons(other) {
            Some(extra) => format!("{}× {}\n{}{}", item.qty, item.name, INDENT, extra),
            None => format!("{}× {}", item.qty, item.name),
        },
    }
}

/// Short detail line shown under a cart entry.
pub fn cart_details(item: &LineItem, catalog: &Catalog) -> String {
    match &item.details {
        ItemDetails::PizzaSingle {
            crust,
            toppings,
            free,
            ..
        } => {
            let crust_label = catalog
                .pizza
                .as_ref()
                .and_then(|p| p.crust(crust))
                .map(|c| c.label.as_str())
                .unwrap_or(crust.as_str());
            format!(
                "{}. Toppings: {}{}",
                crust_label,
                topping_list(catalog, toppings),
                free_suffix(free)
            )
        }
        ItemDetails::PizzaDouble { toppings, free, .. } => format!(
            "Toppings (both pizzas): {}{}",
            topping_list(catalog, toppings),
            free_suffix(free)
        ),
        other => add_ons(other).unwrap_or_default(),
    }
}

/// Comma-separated topping labels, `(×2)` marking double-weight toppings.
pub fn topping_list(catalog: &Catalog, topping_ids: &[String]) -> String {
    if topping_ids.is_empty() {
        return NO_TOPPINGS.to_string();
    }
    topping_ids
        .iter()
        .map(|id| match catalog.pizza.as_ref().and_then(|p| p.topping(id)) {
            Some(t) if t.is_double() => format!("{}(×2)", t.label),
            Some(t) => t.label.clone(),
            None => id.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn find_size<'a>(sizes: &'a [PizzaSize], size_id: &str) -> Option<&'a str> {
    sizes
        .iter()
        .find(|s| s.id == size_id)
        .map(|s| s.label.as_str())
}

fn free_line(free: &[String]) -> String {
    if free.is_empty() {
        String::new()
    } else {
        format!("\n{}Free: {}", INDENT, free.join(", "))
    }
}

fn free_suffix(free: &[String]) -> String {
    if free.is_empty() {
        String::new()
    } else {
        format!(" • Free: {}", free.join(", "))
    }
}

fn add_ons(details: &ItemDetails) -> Option<String> {
    match details {
        ItemDetails::Sub {
            extra_meat,
            extra_cheese,
            ..
        } => {
            let extras: Vec<&str> = [(*extra_meat, "Extra Meat"), (*extra_cheese, "Extra Cheese")]
                .into_iter()
                .filter_map(|(on, label)| on.then_some(label))
                .collect();
            (!extras.is_empty()).then(|| format!("Add: {}", extras.join(", ")))
        }
        ItemDetails::Wings { dips, .. } | ItemDetails::Nuggets { dips, .. } => {
            (*dips > 0).then(|| format!("Dips: {}", dips))
        }
        ItemDetails::Salad { chicken: true, .. } => Some("Add: Chicken".to_string()),
        _ => None,
    }
}
