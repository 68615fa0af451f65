//! keystone-admin: drive the Keystone console from a terminal.
//!
//! # Configuration
//!
//! Every option can be given as a flag or through the environment:
//!
//! - `KEYSTONE_ADMIN_EMAIL`: the one administrator (default `admin@techinf.com`)
//! - `KEYSTONE_API_KEY`: web API key of the hosted project
//! - `KEYSTONE_DATABASE_URL`: realtime database URL
//! - `KEYSTONE_IDENTITY_URL`: identity toolkit base URL (emulators)
//! - `KEYSTONE_CACHE`: session cache file (default `.keystone/session.json`)
//! - `KEYSTONE_PASSWORD`: password for `login` and `provision`
//! - `RUST_LOG`: log filter (default `info`)
//!
//! `demo` needs none of the remote settings: it runs a scripted session
//! against in-memory services.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use keystone::catalog::format_amount;
use keystone::prelude::*;
use keystone::session::DEFAULT_ADMIN_EMAIL;
use keystone::telemetry;
use serde_json::json;

/// Password used for every account in the offline demo.
const DEMO_PASSWORD: &str = "demo-secret";

/// Command-line front end for the Keystone admin console.
#[derive(Parser, Debug)]
#[command(name = "keystone-admin")]
#[command(version, about, long_about = None)]
struct Args {
    /// The administrator's email address
    #[arg(long, env = "KEYSTONE_ADMIN_EMAIL", default_value = DEFAULT_ADMIN_EMAIL, global = true)]
    admin_email: String,

    /// Web API key of the hosted project
    #[arg(long, env = "KEYSTONE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Realtime database URL
    #[arg(long, env = "KEYSTONE_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Identity toolkit base URL override
    #[arg(long, env = "KEYSTONE_IDENTITY_URL", global = true)]
    identity_url: Option<String>,

    /// Where the session is kept between runs
    #[arg(long, env = "KEYSTONE_CACHE", default_value = ".keystone/session.json", global = true)]
    cache: PathBuf,

    /// Seconds to wait for the provider before giving up
    #[arg(long, env = "KEYSTONE_TIMEOUT_SECS", default_value_t = 15, global = true)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scripted session against in-memory services
    Demo,

    #[command(flatten)]
    Console(ConsoleCommand),
}

#[derive(Subcommand, Debug)]
enum ConsoleCommand {
    /// Sign in as the administrator
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KEYSTONE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create the administrator account (first run only)
    Provision {
        #[arg(long)]
        email: String,
        #[arg(long, env = "KEYSTONE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the cached session
    Logout,

    /// Show the current session
    Status,

    /// Show what navigating to PATH would do
    Route { path: String },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoryAction>,
    },

    /// Manage products
    Products {
        #[command(subcommand)]
        action: Option<ProductAction>,
    },

    /// List orders, newest first
    Orders,

    /// Move an order to a new status
    SetStatus {
        id: String,
        /// One of placed, pending, processing, delivered, cancelled
        status: String,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryAction {
    List,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        image: String,
    },
    Remove {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ProductAction {
    List,
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        price: f64,
        #[arg(long, default_value = "")]
        description: String,
        /// Title of the category the product belongs to
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        image: String,
    },
    Remove {
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let args = Args::parse();

    let result = match &args.command {
        Command::Demo => demo(&args.admin_email).await,
        Command::Console(command) => remote(&args, command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one command against the hosted services.
async fn remote(args: &Args, command: &ConsoleCommand) -> Result<(), ConsoleError> {
    let (Some(api_key), Some(database_url)) = (&args.api_key, &args.database_url) else {
        Args::command()
            .error(
                ClapErrorKind::MissingRequiredArgument,
                "--api-key and --database-url (or KEYSTONE_API_KEY and KEYSTONE_DATABASE_URL) are required",
            )
            .exit();
    };

    let mut config = RestConfig::new(api_key, database_url);
    if let Some(url) = &args.identity_url {
        config.identity_base_url = url.clone();
    }
    config.timeout = Duration::from_secs(args.timeout_secs);

    let gateway = Arc::new(RestIdentityGateway::new(config.clone())?);
    let documents = Arc::new(RestDocumentStore::new(&config)?);
    let console = Console::builder(gateway, documents)
        .admin_email(args.admin_email.as_str())
        .gateway_timeout(config.timeout)
        .file_cache(&args.cache)
        .build()?;

    let result = execute(&console, command).await;
    console.shutdown().await;
    result
}

async fn execute<G: IdentityGateway, D: DocumentStore>(
    console: &Console<G, D>,
    command: &ConsoleCommand,
) -> Result<(), ConsoleError> {
    match command {
        ConsoleCommand::Login { email, password } => {
            settled(console.session().login(email, password).await)
        }
        ConsoleCommand::Provision { email, password } => {
            settled(console.session().provision(email, password).await)
        }
        ConsoleCommand::Logout => settled(console.session().logout().await),
        ConsoleCommand::Status => {
            print_state(&console.state());
            Ok(())
        }
        ConsoleCommand::Route { path } => {
            println!("{path}: {}", describe(console.route(path)));
            Ok(())
        }
        ConsoleCommand::Categories { action } => {
            let catalog = console.catalog(Destination::Categories)?;
            match action.as_ref().unwrap_or(&CategoryAction::List) {
                CategoryAction::List => print_categories(&catalog.list::<Category>().await?),
                CategoryAction::Add { title, image } => {
                    let id = catalog.create(&Category::new(title, image)).await?;
                    println!("created category {id}");
                }
                CategoryAction::Remove { id } => {
                    catalog.delete::<Category>(id).await?;
                    println!("deleted category {id}");
                }
            }
            Ok(())
        }
        ConsoleCommand::Products { action } => {
            let catalog = console.catalog(Destination::Products)?;
            match action.as_ref().unwrap_or(&ProductAction::List) {
                ProductAction::List => print_products(&catalog.list::<Product>().await?),
                ProductAction::Add {
                    title,
                    price,
                    description,
                    category,
                    image,
                } => {
                    let product = Product {
                        title: title.clone(),
                        description: description.clone(),
                        price: *price,
                        image_url: image.clone(),
                        category: category.clone(),
                    };
                    let id = catalog.create(&product).await?;
                    println!("created product {id}");
                }
                ProductAction::Remove { id } => {
                    catalog.delete::<Product>(id).await?;
                    println!("deleted product {id}");
                }
            }
            Ok(())
        }
        ConsoleCommand::Orders => {
            let catalog = console.catalog(Destination::Orders)?;
            print_orders(&catalog.orders().await?);
            Ok(())
        }
        ConsoleCommand::SetStatus { id, status } => {
            let status = OrderStatus::parse(status);
            console
                .catalog(Destination::Orders)?
                .update_status(id, status.clone())
                .await?;
            println!("order {id} is now {status}");
            Ok(())
        }
    }
}

/// Walks through a whole session against in-memory services.
async fn demo(admin_email: &str) -> Result<(), ConsoleError> {
    let gateway = Arc::new(MemoryIdentityGateway::new().with_account("eve@example.com", DEMO_PASSWORD));
    let documents = Arc::new(MemoryDocumentStore::with_root(sample_documents()));
    let console = Console::builder(gateway, documents)
        .admin_email(admin_email)
        .build()?;

    println!("== provision {admin_email}");
    settled(console.session().provision(admin_email, DEMO_PASSWORD).await)?;

    println!("\n== sign in as someone else");
    let denied = console.session().login("eve@example.com", DEMO_PASSWORD).await;
    print_state(&denied);
    println!("{}: {}", Destination::Orders, describe(console.route(Destination::Orders.path())));

    println!("\n== sign back in");
    settled(console.session().login(admin_email, DEMO_PASSWORD).await)?;

    println!("\n== catalog");
    print_categories(&console.catalog(Destination::Categories)?.list::<Category>().await?);
    print_products(&console.catalog(Destination::Products)?.list::<Product>().await?);

    println!("\n== orders");
    let orders = console.catalog(Destination::Orders)?;
    print_orders(&orders.orders().await?);
    orders.update_status("order-1", OrderStatus::Processing).await?;
    if let Err(e) = orders.update_status("order-2", OrderStatus::Pending).await {
        println!("order-2 unchanged: {e}");
    }
    print_orders(&orders.orders().await?);

    println!("\n== sign out");
    settled(console.session().logout().await)?;
    println!("{}: {}", Destination::Orders, describe(console.route(Destination::Orders.path())));

    console.shutdown().await;
    Ok(())
}

fn sample_documents() -> serde_json::Value {
    json!({
        "categories": {
            "cat-1": { "title": "Footwear", "imageUrl": "" },
            "cat-2": { "title": "Bags", "imageUrl": "https://img.example.com/bags.png" }
        },
        "products": {
            "prod-1": {
                "title": "Trail Boot",
                "description": "Waterproof leather boot with a grippy sole for rough ground",
                "price": "3499",
                "imageUrl": "",
                "category": "Footwear"
            },
            "prod-2": { "title": "Day Pack", "price": 1299.5, "category": "Bags" }
        },
        "orders": {
            "order-1": {
                "status": "placed",
                "orderDate": "2024-05-02T10:15:00.000Z",
                "paymentMethod": "UPI",
                "totalAmount": 4798.5,
                "items": [
                    { "title": "Trail Boot", "quantity": 1, "price": 3499 },
                    { "title": "Day Pack", "quantity": 1, "price": "1299.5" }
                ]
            },
            "order-2": {
                "status": "delivered",
                "orderDate": "2024-04-18T08:00:00.000Z",
                "totalAmount": "1299.5"
            }
        }
    })
}

/// Prints the state and turns a carried error into a failure.
fn settled(state: SessionState) -> Result<(), ConsoleError> {
    print_state(&state);
    match state.error() {
        Some(error) => Err(error.clone().into()),
        None => Ok(()),
    }
}

fn print_state(state: &SessionState) {
    println!("session: {}", state.phase());
    if let Some(email) = state.email() {
        println!("  email: {email}");
    }
    if let Some(uid) = state.uid() {
        println!("  uid:   {uid}");
    }
    if let Some(error) = state.error() {
        println!("  error: {error}");
    }
}

fn describe(route: Route) -> String {
    match route {
        Route::Entry => "sign-in screen".to_string(),
        Route::Allow(destination) => format!("open {destination}"),
        Route::Redirect { to } => format!("redirect to {to}"),
        Route::NotFound => "not found".to_string(),
    }
}

fn print_categories(categories: &[Entry<Category>]) {
    println!("{} categories", categories.len());
    for Entry { id, value } in categories {
        println!("  {id:<12} {:<24} {}", value.title, value.image());
    }
}

fn print_products(products: &[Entry<Product>]) {
    println!("{} products", products.len());
    for Entry { id, value } in products {
        println!(
            "  {id:<12} {:<24} {:>12} {:<12} {}",
            value.title,
            format_amount(value.price),
            value.category_label(),
            value.summary()
        );
    }
}

fn print_orders(orders: &[Entry<Order>]) {
    println!("{} orders", orders.len());
    for Entry { id, value } in orders {
        let placed = value
            .placed_at()
            .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        let lock = if value.is_locked() { " (locked)" } else { "" };
        println!(
            "  {id:<12} {placed:<17} {:<11} [{}]{lock} {:>12} {}",
            value.status_label(),
            value.badge(),
            format_amount(value.total_amount),
            value.payment_label()
        );
        for item in &value.items {
            println!(
                "      {} x{} @ {}",
                item.title(),
                item.quantity(),
                format_amount(item.price)
            );
        }
    }
}
