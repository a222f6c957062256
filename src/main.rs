use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use supplychain_client::config::{self, EnvOverrides, Settings};
use supplychain_client::core::TxStatus;
use supplychain_client::domain::{
    short_account, Operation, ProductDraft, ProductForm, RegistrationForm, RegistryRole,
};
use supplychain_client::infrastructure::ethereum::{
    AlloyConnector, FixedWallet, InMemoryConnector, InMemoryLedger, LedgerConnector,
    LocalKeyWallet, NodeWallet, ProviderConfig, WalletProvider,
};
use supplychain_client::modules::dashboard::DashboardStats;
use supplychain_client::modules::export::{self, ExportFormat};
use supplychain_client::modules::transactions::SubmitOutcome;
use supplychain_client::{App, AppOptions, DataMode};

#[derive(Debug, Parser)]
#[command(
    name = "supplychain",
    version,
    about = "Supply-chain registry client: products, roles and transactions"
)]
struct Args {
    /// JSON-RPC endpoint (http(s):// or ws(s)://)
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// Registry contract address
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Use the in-memory demo registry instead of a node
    #[arg(long, global = true)]
    mock: bool,

    /// Stay read-only; never request a signer
    #[arg(long, global = true)]
    no_wallet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dashboard statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// List every readable product
    Products {
        #[arg(long, value_enum, default_value_t = ExportFormat::Table)]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(long, conflicts_with = "export")]
        out: Option<PathBuf>,
        /// Write to a timestamped file in the export directory
        #[arg(long)]
        export: bool,
    },
    /// Full details of one product
    Product { id: String },
    /// Classify an address
    Role { address: String },
    /// Register a participant (defaults to the connected account)
    Register {
        role: RegistryRole,
        details: String,
        #[arg(long)]
        address: Option<String>,
    },
    CreateProduct {
        #[arg(long)]
        name: String,
        #[arg(long)]
        batch: String,
        #[arg(long)]
        category: String,
        /// YYYY-MM-DD, RFC 3339 or unix seconds
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        metadata: String,
    },
    AssignDistributor { product_id: String, distributor: String },
    AssignRetailer { product_id: String, retailer: String },
    /// Add a certification to a product
    Certify { product_id: String, certification: String },
    /// Approve product quality until `expiry`
    Approve { product_id: String, expiry: String },
    Sell { product_id: String, consumer: String },
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(
            self,
            Command::Stats { .. }
                | Command::Products { .. }
                | Command::Product { .. }
                | Command::Role { .. }
        )
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = config::load();
    let rpc = args.rpc.as_deref().map(normalize_endpoint);
    let settings =
        config.resolve(&EnvOverrides::from_env(), rpc.as_deref(), args.contract.as_deref())?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted");
                cancel.cancel();
            }
        }
    });

    let mut app = open_app(&args, &settings).await?;

    if args.command.mutates() {
        if app.connection().has_wallet() {
            app.connect_wallet().await;
            println!("{}", app.status());
        }
    } else if !args.no_wallet && app.data_mode == DataMode::Mock {
        // Mock wallets cannot fail; connect so "You" and ownership resolve
        app.connect_wallet().await;
    }

    match args.command {
        Command::Stats { json } => {
            let Some(snapshot) = app.update_dashboard(&cancel).await? else {
                return Ok(ExitCode::from(130));
            };
            if json {
                export::write_stats(io::stdout().lock(), &snapshot.stats)?;
            } else {
                println!("Account: {}", describe_account(app.account().await));
                print_stats(&snapshot.stats, &snapshot.scan_summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Products {
            format,
            out,
            export: to_export_dir,
        } => {
            if app.load_all_products(&cancel).await?.is_none() {
                return Ok(ExitCode::from(130));
            }
            eprintln!("{}", app.status());
            let path = out.or_else(|| to_export_dir.then(|| export::default_export_path(format)));
            match path {
                Some(path) => {
                    let count = export::export_products(&path, format, &app.products)?;
                    println!("Exported {count} products to {}", path.display());
                }
                None => {
                    export::write_products(io::stdout().lock(), format, &app.products)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Product { id } => {
            let Some(details) = app.search_product(&id).await else {
                eprintln!("{}", app.status());
                return Ok(ExitCode::FAILURE);
            };
            println!("{}", serde_json::to_string_pretty(details)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Role { address } => match app.role_for_address(&address).await {
            Ok(role) => {
                println!("{role}");
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => {
                eprintln!("{err}");
                Ok(ExitCode::FAILURE)
            }
        },
        Command::Register {
            role,
            details,
            address,
        } => {
            let mut form = RegistrationForm::new(role);
            form.details = details;
            match address {
                Some(address) => form.account = address,
                None => {
                    if let Err(err) = form.fill_account(app.account().await) {
                        eprintln!("{}", TxStatus::Failure(err.to_string()));
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
            let outcome = app.submit_form(&mut form, &cancel).await;
            Ok(report(&app, outcome))
        }
        Command::CreateProduct {
            name,
            batch,
            category,
            date,
            metadata,
        } => {
            let mut form = ProductForm {
                draft: ProductDraft {
                    name,
                    batch_id: batch,
                    category,
                    production_date: date,
                    metadata_uri: metadata,
                },
            };
            let outcome = app.submit_form(&mut form, &cancel).await;
            Ok(report(&app, outcome))
        }
        Command::AssignDistributor {
            product_id,
            distributor,
        } => {
            let op = Operation::AssignDistributor {
                product_id,
                distributor,
            };
            Ok(report(&app, app.submit(op, &cancel).await))
        }
        Command::AssignRetailer {
            product_id,
            retailer,
        } => {
            let op = Operation::AssignRetailer {
                product_id,
                retailer,
            };
            Ok(report(&app, app.submit(op, &cancel).await))
        }
        Command::Certify {
            product_id,
            certification,
        } => {
            let op = Operation::AddCertification {
                product_id,
                certification,
            };
            Ok(report(&app, app.submit(op, &cancel).await))
        }
        Command::Approve { product_id, expiry } => {
            let op = Operation::ApproveQuality {
                product_id,
                expiry_date: expiry,
            };
            Ok(report(&app, app.submit(op, &cancel).await))
        }
        Command::Sell {
            product_id,
            consumer,
        } => {
            let op = Operation::SellToConsumer {
                product_id,
                consumer,
            };
            Ok(report(&app, app.submit(op, &cancel).await))
        }
    }
}

async fn open_app(args: &Args, settings: &Settings) -> Result<App> {
    let options = AppOptions::from(settings);

    if args.mock {
        let accounts = vec![
            Address::repeat_byte(0x11),
            Address::repeat_byte(0x22),
            Address::repeat_byte(0x33),
        ];
        let ledger = InMemoryLedger::demo(&accounts);
        let wallet: Option<Arc<dyn WalletProvider>> = if args.no_wallet {
            None
        } else {
            Some(Arc::new(FixedWallet::new(accounts)))
        };
        let connector: Arc<dyn LedgerConnector> = Arc::new(InMemoryConnector::new(ledger));
        return App::open(DataMode::Mock, connector, wallet, options).await;
    }

    let endpoint = ProviderConfig::from_url(&settings.rpc_url)?;
    let wallet: Option<Arc<dyn WalletProvider>> = if args.no_wallet {
        None
    } else if let Some(key) = settings.private_key.as_deref() {
        Some(Arc::new(LocalKeyWallet::from_hex(key)?))
    } else {
        Some(Arc::new(NodeWallet::new(settings.rpc_url.clone())))
    };
    tracing::debug!(
        endpoint = %endpoint.display(),
        contract = %settings.contract_address,
        "opening ledger"
    );
    let connector: Arc<dyn LedgerConnector> =
        Arc::new(AlloyConnector::new(endpoint, settings.contract_address));
    App::open(DataMode::Rpc, connector, wallet, options).await
}

fn report(app: &App, outcome: SubmitOutcome) -> ExitCode {
    match &outcome {
        SubmitOutcome::Confirmed {
            tx_hash,
            block_number,
        } => {
            println!("{}", app.status());
            match block_number {
                Some(block) => println!("tx {tx_hash} (block {block})"),
                None => println!("tx {tx_hash}"),
            }
            ExitCode::SUCCESS
        }
        SubmitOutcome::Cancelled => {
            eprintln!("cancelled");
            ExitCode::from(130)
        }
        SubmitOutcome::Rejected(_) | SubmitOutcome::Failed(_) => {
            eprintln!("{}", app.status());
            ExitCode::FAILURE
        }
    }
}

fn print_stats(stats: &DashboardStats, summary: &str) {
    println!("{summary}");
    println!("  Total products          {}", stats.total_products);
    if stats.unreadable_products > 0 {
        println!("    unreadable            {}", stats.unreadable_products);
    }
    println!("  Approved products       {}", stats.approved_products);
    println!("  Your products           {}", stats.owned_by_caller);
    println!("  Registered participants {}", stats.registered_participants);
    if !stats.unavailable_counters.is_empty() {
        let names: Vec<&str> = stats
            .unavailable_counters
            .iter()
            .map(|role| role.label())
            .collect();
        println!("    counters unavailable  {}", names.join(", "));
    }
    println!("  Transfers               {}", stats.transfers);
}

fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn describe_account(account: Option<Address>) -> String {
    account
        .map(|a| short_account(&a))
        .unwrap_or_else(|| "read-only".to_string())
}
