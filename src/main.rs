use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pizza_order::{
    common::{format_money, percent_label},
    config::{self, AppConfig},
    errors::ServiceError,
    models::{
        catalog::{Catalog, PaymentLink, PricedOption, StoreSettings},
        item::{ItemDetails, LineItem, Selection},
        order::{CustomerFields, PaymentMode, Totals},
    },
    services::commerce::{
        cart_service::{tip_label, CartService, TipMode},
        checkout_service::{last_order, OrderPreview},
        ticket_service::{cart_details, render_kitchen_ticket},
        CatalogService, CheckoutService, HttpOrderSink, OrderService, PricingService,
    },
    session::FileSessionStore,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut context = CliContext::initialize().await?;

    match cli.command {
        Commands::Menu => handle_menu(&context, cli.json)?,
        Commands::Add(command) => handle_add_command(&mut context, command, cli.json)?,
        Commands::Cart => render_cart(&context, cli.json)?,
        Commands::Inc(args) => {
            context.cart.increment_quantity(args.index()?)?;
            render_cart(&context, cli.json)?;
        }
        Commands::Dec(args) => {
            context.cart.decrement_quantity(args.index()?)?;
            render_cart(&context, cli.json)?;
        }
        Commands::Remove(args) => {
            let removed = context.cart.remove_item(args.index()?)?;
            if !cli.json {
                println!("Removed {}", removed.name);
            }
            render_cart(&context, cli.json)?;
        }
        Commands::Tip(command) => handle_tip_command(&mut context, command, cli.json)?,
        Commands::Clear => {
            context.cart.clear()?;
            render_cart(&context, cli.json)?;
        }
        Commands::Checkout(args) => handle_checkout(&mut context, args, cli.json).await?,
        Commands::LastOrder => handle_last_order(&context, cli.json)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "pizza-order",
    about = "Build a pickup order: browse the menu, fill the cart, check out",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the menu and the tip options
    Menu,
    /// Add an item to the cart
    #[command(subcommand)]
    Add(AddCommands),
    /// Show the cart and its totals
    Cart,
    /// Increase the quantity of a cart line
    Inc(LineArgs),
    /// Decrease the quantity of a cart line (removes it at zero)
    Dec(LineArgs),
    /// Remove a cart line
    Remove(LineArgs),
    /// Choose the tip
    #[command(subcommand)]
    Tip(TipCommands),
    /// Empty the cart
    Clear,
    /// Validate and send the order
    Checkout(CheckoutArgs),
    /// Show the confirmation of the last order sent
    LastOrder,
}

#[derive(Args)]
struct LineArgs {
    #[arg(help = "Cart line number as shown by `cart` (starting at 1)")]
    line: usize,
}

impl LineArgs {
    fn index(&self) -> Result<usize> {
        self.line
            .checked_sub(1)
            .ok_or_else(|| anyhow!("cart line numbers start at 1"))
    }
}

#[derive(Args)]
struct QtyArgs {
    #[arg(long, default_value_t = 1, help = "Quantity")]
    qty: u32,
}

#[derive(Subcommand)]
enum AddCommands {
    /// Build-your-own single pizza
    Single {
        #[arg(long, default_value = "l")]
        size: String,
        #[arg(long, default_value = "white")]
        crust: String,
        #[arg(long = "topping", help = "Topping id, repeatable")]
        toppings: Vec<String>,
        #[arg(long = "free", help = "Free extra, repeatable")]
        free: Vec<String>,
        #[command(flatten)]
        qty: QtyArgs,
    },
    /// Two pizzas with the same toppings
    Double {
        #[arg(long, default_value = "l")]
        size: String,
        #[arg(long = "topping", help = "Topping id, repeatable")]
        toppings: Vec<String>,
        #[arg(long = "free", help = "Free extra, repeatable")]
        free: Vec<String>,
        #[command(flatten)]
        qty: QtyArgs,
    },
    Special {
        id: String,
        #[arg(long, action = ArgAction::SetTrue, help = "Upgrade to X-Large")]
        xl: bool,
        #[command(flatten)]
        qty: QtyArgs,
    },
    Sub {
        id: String,
        #[arg(long, action = ArgAction::SetTrue)]
        extra_meat: bool,
        #[arg(long, action = ArgAction::SetTrue)]
        extra_cheese: bool,
        #[command(flatten)]
        qty: QtyArgs,
    },
    Wings {
        #[arg(long)]
        size: String,
        /// Defaults to the first flavor on the menu
        #[arg(long)]
        flavor: Option<String>,
        #[arg(long, default_value_t = 0)]
        dips: u32,
        #[command(flatten)]
        qty: QtyArgs,
    },
    Nuggets {
        #[arg(long)]
        size: String,
        #[arg(long, default_value_t = 0)]
        dips: u32,
        #[command(flatten)]
        qty: QtyArgs,
    },
    Salad {
        id: String,
        #[arg(long, action = ArgAction::SetTrue)]
        chicken: bool,
        #[command(flatten)]
        qty: QtyArgs,
    },
    Side {
        id: String,
        #[command(flatten)]
        qty: QtyArgs,
    },
    Drink {
        id: String,
        #[command(flatten)]
        qty: QtyArgs,
    },
}

impl AddCommands {
    fn into_selection(self, catalog: &Catalog) -> Selection {
        let (details, qty) = match self {
            AddCommands::Single {
                size,
                crust,
                toppings,
                free,
                qty,
            } => (
                ItemDetails::PizzaSingle {
                    size,
                    crust,
                    toppings,
                    free,
                },
                qty,
            ),
            AddCommands::Double {
                size,
                toppings,
                free,
                qty,
            } => (
                ItemDetails::PizzaDouble {
                    size,
                    toppings,
                    free,
                },
                qty,
            ),
            AddCommands::Special { id, xl, qty } => (ItemDetails::Special { special: id, xl }, qty),
            AddCommands::Sub {
                id,
                extra_meat,
                extra_cheese,
                qty,
            } => (
                ItemDetails::Sub {
                    sub: id,
                    extra_meat,
                    extra_cheese,
                },
                qty,
            ),
            AddCommands::Wings {
                size,
                flavor,
                dips,
                qty,
            } => {
                let flavor = flavor.unwrap_or_else(|| {
                    catalog
                        .wings
                        .as_ref()
                        .and_then(|menu| menu.flavors.first().cloned())
                        .unwrap_or_default()
                });
                (ItemDetails::Wings { size, flavor, dips }, qty)
            }
            AddCommands::Nuggets { size, dips, qty } => (ItemDetails::Nuggets { size, dips }, qty),
            AddCommands::Salad { id, chicken, qty } => (
                ItemDetails::Salad {
                    salad: id,
                    chicken,
                },
                qty,
            ),
            AddCommands::Side { id, qty } => (ItemDetails::Side { side: id }, qty),
            AddCommands::Drink { id, qty } => (ItemDetails::Drink { drink: id }, qty),
        };
        Selection::new(details, qty.qty)
    }
}

#[derive(Subcommand)]
enum TipCommands {
    /// Tip a percentage of the subtotal, e.g. `tip percent 18`
    Percent { percent: Decimal },
    /// Tip a fixed amount, e.g. `tip fixed 5.00`
    Fixed { amount: Decimal },
    /// No tip
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaymentArg {
    Online,
    PayAtPickup,
}

impl From<PaymentArg> for PaymentMode {
    fn from(value: PaymentArg) -> Self {
        match value {
            PaymentArg::Online => PaymentMode::Online,
            PaymentArg::PayAtPickup => PaymentMode::PayAtPickup,
        }
    }
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(long, help = "Name for the pickup order")]
    name: String,
    #[arg(long, help = "Contact phone number")]
    phone: String,
    #[arg(long, default_value = "", help = "Minutes until pickup; empty for ASAP")]
    pickup: String,
    #[arg(long, default_value = "", help = "Notes for the kitchen")]
    notes: String,
    #[arg(long, value_enum, default_value = "pay-at-pickup")]
    payment: PaymentArg,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Build and print the order without sending it"
    )]
    dry_run: bool,
}

struct CliContext {
    config: AppConfig,
    catalog: Arc<Catalog>,
    settings: Arc<StoreSettings>,
    cart: CartService<FileSessionStore>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(&config.log_level, config.log_json);

        let provider = CatalogService::new(config.fetch_timeout())
            .context("failed to build catalog client")?;
        let catalog = provider
            .load_catalog(config.catalog_source.as_deref())
            .await
            .into_value();
        let settings = provider
            .load_settings(config.settings_source.as_deref())
            .await
            .into_value();

        let store = FileSessionStore::open(&config.session_dir)
            .with_context(|| format!("failed to open session dir {}", config.session_dir))?;
        let cart = CartService::restore(store, settings.tax_rate, &settings.tip_options());
        debug!(lines = cart.cart().len(), "CLI context ready");

        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            settings: Arc::new(settings),
            cart,
        })
    }

    fn pricing(&self) -> PricingService {
        PricingService::new(self.catalog.clone())
    }

    fn orders(&self) -> OrderService {
        OrderService::new(self.settings.clone(), self.catalog.currency.clone())
    }

    fn money(&self, amount: Decimal) -> String {
        format_money(amount, &self.catalog.currency)
    }

    fn tax_label(&self) -> String {
        format!(
            "{} ({}%)",
            self.settings.tax_name,
            percent_label(self.settings.tax_rate)
        )
    }

    fn user_error(&self, err: ServiceError) -> anyhow::Error {
        debug!(error = %err, "Request refused");
        anyhow!(err.status_text(&self.settings.phone))
    }
}

fn handle_add_command(context: &mut CliContext, command: AddCommands, json: bool) -> Result<()> {
    let selection = command.into_selection(&context.catalog);
    let line = context
        .pricing()
        .quote(&selection)
        .map_err(|e| context.user_error(e))?;
    let name = line.name.clone();
    context.cart.add_item(line)?;

    if !json {
        println!("Added to cart: {}", name);
    }
    render_cart(context, json)
}

fn handle_tip_command(context: &mut CliContext, command: TipCommands, json: bool) -> Result<()> {
    match command {
        TipCommands::Percent { percent } => {
            let pct = percent / Decimal::ONE_HUNDRED;
            let allowed = context.settings.tip_options();
            context
                .cart
                .set_tip_percent(pct, &allowed)
                .map_err(|e| context.user_error(e))?;
        }
        TipCommands::Fixed { amount } => {
            context
                .cart
                .set_fixed_tip(amount)
                .map_err(|e| context.user_error(e))?;
        }
        TipCommands::Clear => context.cart.clear_tip()?,
    }
    render_cart(context, json)
}

async fn handle_checkout(context: &mut CliContext, args: CheckoutArgs, json: bool) -> Result<()> {
    let customer = CustomerFields::new(args.name, args.phone)
        .with_pickup(args.pickup)
        .with_notes(args.notes);
    let payment = PaymentMode::from(args.payment);

    if args.dry_run {
        let built = context
            .orders()
            .build_order(context.cart.cart(), &customer, payment, Local::now())
            .map_err(|e| context.user_error(e))?;
        let ticket =
            render_kitchen_ticket(&built.order, &context.catalog, &context.settings.store_name);
        if json {
            return print_json(&OrderPreview { built, ticket });
        }
        if let Some(advisory) = built.advisory {
            println!("{}", advisory.message());
        }
        println!("{}", ticket);
        return Ok(());
    }

    let url = context
        .config
        .sink_url
        .clone()
        .ok_or_else(|| anyhow!("no order sink configured; set APP__SINK_URL or use --dry-run"))?;
    let sink = HttpOrderSink::new(url, context.config.sink_timeout())
        .context("failed to build order sink")?;
    let checkout = CheckoutService::new(
        context.catalog.clone(),
        Arc::new(context.orders()),
        Arc::new(sink),
    );

    let confirmation = match checkout
        .place_order(&mut context.cart, &customer, payment)
        .await
    {
        Ok(confirmation) => confirmation,
        Err(e) => return Err(context.user_error(e)),
    };

    if json {
        return print_json(&confirmation);
    }
    if let Some(advisory) = confirmation.advisory {
        println!("{}", advisory.message());
    }
    println!("Order sent!");
    println!("{}", confirmation.message);
    print_payment_links(confirmation.payment_links.iter());
    Ok(())
}

fn print_payment_links<'a>(links: impl Iterator<Item = &'a PaymentLink>) {
    for link in links {
        if let Some(url) = link.url.as_deref() {
            println!("{}: {}", link.button_label(), url.trim());
        }
    }
}

fn handle_last_order(context: &CliContext, json: bool) -> Result<()> {
    let Some(last) = last_order(context.cart.store()).context("failed to read last order")? else {
        println!("No order has been sent in this session.");
        return Ok(());
    };

    if json {
        return print_json(&last);
    }

    let pickup = if last.pickup == "ASAP" {
        "ASAP".to_string()
    } else {
        format!("~{} min", last.pickup)
    };
    let placed = last
        .created_at
        .with_timezone(&Local)
        .format("%H:%M");
    println!(
        "Order {}. Pickup: {}. Placed at {}. If anything changes, call {}.",
        last.id, pickup, placed, last.phone
    );
    for item in &last.items {
        render_line(context, None, item);
    }
    println!("Subtotal: {}", format_money(last.totals.subtotal, &last.currency));
    println!(
        "{}: {}",
        context.tax_label(),
        format_money(last.totals.tax, &last.currency)
    );
    println!("Tip: {}", format_money(last.totals.tip, &last.currency));
    println!("Total: {}", format_money(last.totals.total, &last.currency));
    if last.payment == PaymentMode::Online {
        print_payment_links(context.settings.payment_links());
    }
    Ok(())
}

#[derive(Serialize)]
struct MenuView<'a> {
    catalog: &'a Catalog,
    tip_options: Vec<Decimal>,
    tax_rate: Decimal,
    tax_name: &'a str,
}

fn handle_menu(context: &CliContext, json: bool) -> Result<()> {
    let catalog = context.catalog.as_ref();
    if json {
        return print_json(&MenuView {
            catalog,
            tip_options: context.settings.tip_options(),
            tax_rate: context.settings.tax_rate,
            tax_name: &context.settings.tax_name,
        });
    }

    if catalog.is_empty() {
        println!(
            "The menu is unavailable right now. Please call {}.",
            context.settings.phone
        );
        return Ok(());
    }

    println!("{}", context.settings.store_name);
    if let Some(pizza) = &catalog.pizza {
        println!("\nSingle pizza (add single --size <id> --crust <id> --topping <id>...)");
        for size in &pizza.sizes {
            let extra = pizza
                .extra_topping_by_size
                .get(&size.id)
                .map(|p| format!(" (+{} per topping)", context.money(*p)))
                .unwrap_or_default();
            println!("  {:<8} {:<12} {}{}", size.id, size.label, context.money(size.base), extra);
        }
        for crust in &pizza.crusts {
            println!("  crust {:<8} {} +{}", crust.id, crust.label, context.money(crust.upcharge));
        }
        let toppings: Vec<String> = pizza
            .toppings
            .iter()
            .map(|t| {
                if t.is_double() {
                    format!("{} ({}, counts as 2)", t.id, t.label)
                } else {
                    format!("{} ({})", t.id, t.label)
                }
            })
            .collect();
        println!("  toppings: {}", toppings.join(", "));
        if !pizza.free_extras.is_empty() {
            println!("  free extras: {}", pizza.free_extras.join(", "));
        }
    }
    if let Some(double) = &catalog.double_deal {
        println!("\nDouble deal (add double --size <id> --topping <id>...)");
        for size in &double.sizes {
            println!("  {:<8} {:<12} {}", size.id, size.label, context.money(size.base));
        }
    }
    if let Some(specials) = &catalog.specials {
        println!(
            "\nSpecials (add special <id> [--xl +{}])",
            context.money(specials.xl_upcharge)
        );
        for item in &specials.items {
            println!("  {:<12} {:<24} {}", item.id, item.label, context.money(item.price));
        }
    }
    if let Some(subs) = &catalog.subs {
        print_options(context, "Subs (add sub <id>)", &subs.items);
    }
    if let Some(wings) = &catalog.wings {
        print_options(context, "Wings (add wings --size <id> --flavor <name>)", &wings.sizes);
        if !wings.flavors.is_empty() {
            println!("  flavors: {}", wings.flavors.join(", "));
        }
    }
    if let Some(nuggets) = &catalog.nuggets {
        print_options(context, "Nuggets (add nuggets --size <id>)", &nuggets.sizes);
    }
    if let Some(salads) = &catalog.salads {
        print_options(context, "Salads (add salad <id>)", &salads.items);
    }
    if let Some(sides) = &catalog.sides {
        print_options(context, "Sides (add side <id>)", &sides.items);
    }
    if let Some(drinks) = &catalog.drinks {
        print_options(context, "Drinks (add drink <id>)", &drinks.items);
    }

    let tips: Vec<String> = context
        .settings
        .tip_options()
        .into_iter()
        .map(tip_label)
        .collect();
    println!("\nTips: {}", tips.join(" | "));
    Ok(())
}

fn print_options(context: &CliContext, heading: &str, options: &[PricedOption]) {
    println!("\n{}", heading);
    for option in options {
        println!(
            "  {:<12} {:<24} {}",
            option.id,
            option.label,
            context.money(option.price)
        );
    }
}

#[derive(Serialize)]
struct CartView<'a> {
    items: &'a [LineItem],
    tip: TipMode,
    tax_rate: Decimal,
    totals: Totals,
}

fn render_cart(context: &CliContext, json: bool) -> Result<()> {
    let cart = context.cart.cart();
    let totals = cart.compute_totals();

    if json {
        return print_json(&CartView {
            items: cart.items(),
            tip: cart.tip(),
            tax_rate: cart.tax_rate(),
            totals,
        });
    }

    if cart.is_empty() {
        println!("Your cart is empty. Start with a single pizza: add single --size l");
    } else {
        for (i, item) in cart.items().iter().enumerate() {
            render_line(context, Some(i + 1), item);
        }
    }

    println!("Subtotal: {}", context.money(totals.subtotal));
    println!("{}: {}", context.tax_label(), context.money(totals.tax));
    println!("Tip: {}", context.money(totals.tip));
    println!("Total: {}", context.money(totals.total));
    Ok(())
}

fn render_line(context: &CliContext, number: Option<usize>, item: &LineItem) {
    let prefix = number.map(|n| format!("{}. ", n)).unwrap_or_default();
    println!(
        "{}{}× {} • {}",
        prefix,
        item.qty,
        item.name,
        context.money(item.line_total)
    );
    let details = cart_details(item, &context.catalog);
    if !details.is_empty() {
        println!("   {}", details);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
