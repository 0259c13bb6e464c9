//! Shopfront CLI - browse the catalog, manage the cart and place orders.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password may also come from SHOPFRONT_PASSWORD)
//! shopfront login -e shopper@example.com -p secret
//!
//! # Browse
//! shopfront products list --featured
//! shopfront products show 7
//!
//! # Cart
//! shopfront cart add 7 --quantity 2
//! shopfront cart show
//!
//! # Place an order
//! shopfront orders create --item 7:2 --item 9:1
//! ```
//!
//! The session is persisted to `$SHOPFRONT_SESSION_FILE`, or
//! `.shopfront-session.json` in the working directory.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use shopfront_core::{CartItemId, OrderId, ProductId};
use shopfront_storefront::{ApiClient, ClientConfig, FileSessionStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{OrderLineArg, TerminalRedirect};

/// Session file used when `SHOPFRONT_SESSION_FILE` is not set.
const DEFAULT_SESSION_FILE: &str = ".shopfront-session.json";

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse and manage the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place and review orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        /// Only featured products
        #[arg(long)]
        featured: bool,
    },
    /// Show one product
    Show {
        /// Product ID
        id: ProductId,
    },
    /// Create a product (admin only)
    Create {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Unit price, e.g. `12.50`
        #[arg(long)]
        price: Option<String>,

        /// Units in stock
        #[arg(long)]
        quantity: Option<u32>,

        #[arg(long)]
        category: Option<String>,

        /// Feature the product on the home page
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        featured: Option<bool>,

        /// Image to upload
        #[arg(long)]
        image_file: Option<PathBuf>,

        /// Remote image URL
        #[arg(long)]
        image_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with totals
    Show,
    /// Add a product
    Add {
        /// Product ID
        product: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change a line's quantity
    Update {
        /// Cart line ID
        item: CartItemId,

        /// New quantity (at least 1)
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Cart line ID
        item: CartItemId,
    },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Place an order
    Create {
        /// Order line as `<product>:<quantity>`; repeatable
        #[arg(long = "item", required = true)]
        items: Vec<OrderLineArg>,
    },
    /// List past orders
    List,
    /// Show one order
    Show {
        /// Order ID
        id: OrderId,
    },
}

/// Report command failures to Sentry when `SENTRY_DSN` is configured.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;
    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Into::into),
        ..Default::default()
    };
    Some(sentry::init((dsn, options)))
}

/// Errors become Sentry events; warnings and info are breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_cli=info,shopfront_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let session_file = config
        .session_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));
    let client = ApiClient::new(
        config,
        Arc::new(FileSessionStore::new(session_file)),
        Arc::new(TerminalRedirect),
    )?;
    let api = &client;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(api, &email, SecretString::from(password)).await?;
        }
        Commands::Register {
            email,
            password,
            name,
        } => {
            commands::auth::register(api, &email, SecretString::from(password), name).await?;
        }
        Commands::Logout => commands::auth::logout(api)?,
        Commands::Whoami => commands::auth::whoami(api)?,
        Commands::Products { action } => match action {
            ProductAction::List { featured } => commands::products::list(api, featured).await?,
            ProductAction::Show { id } => commands::products::show(api, id).await?,
            ProductAction::Create {
                name,
                description,
                price,
                quantity,
                category,
                featured,
                image_file,
                image_url,
            } => {
                let input = commands::products::CreateInput {
                    name,
                    description,
                    price,
                    quantity,
                    category,
                    featured,
                    image_file,
                    image_url,
                };
                commands::products::create(api, input).await?;
            }
        },
        Commands::Cart { action } => {
            let cart = commands::cart::load(api).await;
            match action {
                CartAction::Show => {}
                CartAction::Add { product, quantity } => cart.add(product, quantity).await?,
                CartAction::Update { item, quantity } => cart.update(item, quantity).await?,
                CartAction::Remove { item } => cart.remove(item).await?,
                CartAction::Clear => cart.clear().await?,
            }
            commands::cart::print(&cart).await;
        }
        Commands::Orders { action } => match action {
            OrderAction::Create { items } => commands::orders::create(api, &items).await?,
            OrderAction::List => commands::orders::list(api).await?,
            OrderAction::Show { id } => commands::orders::show(api, id).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn create_featured(args: &[&str]) -> Option<bool> {
        let mut argv = vec!["shopfront", "products", "create", "--name", "Mug"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Products {
                action: ProductAction::Create { featured, .. },
            } => featured,
            _ => panic!("expected products create"),
        }
    }

    #[test]
    fn test_featured_flag_forms() {
        assert_eq!(create_featured(&[]), None);
        assert_eq!(create_featured(&["--featured"]), Some(true));
        assert_eq!(create_featured(&["--featured", "false"]), Some(false));
    }

    #[test]
    fn test_sentry_disabled_without_dsn() {
        let config = ClientConfig::new("http://localhost:8000").unwrap();
        assert!(init_sentry(&config).is_none());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
