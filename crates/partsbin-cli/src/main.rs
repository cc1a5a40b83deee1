mod context;
mod suppliers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use partsbin_core::{FileType, SupplierCapability};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "partsbin")]
#[command(about = "Supplier lookups, enrichment and order import for the parts inventory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List registered suppliers with their capabilities and settings schemas
    Suppliers,
    /// Check credentials and reachability for one supplier
    Test { supplier: String },
    /// Keyword search
    Search {
        supplier: String,
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Full details for one supplier part number
    Details { supplier: String, part: String },
    /// Run enrichment capabilities for one part
    Enrich {
        supplier: String,
        part: String,
        /// Capability to run (repeatable); defaults to every lookup the supplier supports
        #[arg(long = "capability")]
        capabilities: Vec<SupplierCapability>,
    },
    /// Import an order export file
    Import {
        supplier: String,
        file: PathBuf,
        /// Override the file type inferred from the extension
        #[arg(long)]
        file_type: Option<FileType>,
    },
    /// Run the import compliance checks against registered suppliers
    Audit {
        /// Audit one supplier instead of all of them
        #[arg(long)]
        supplier: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = partsbin_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = context::Context::new(config)?;

    match cli.command {
        Commands::Suppliers => suppliers::run_suppliers(&ctx),
        Commands::Test { supplier } => suppliers::run_test(&ctx, &supplier).await,
        Commands::Search {
            supplier,
            query,
            limit,
        } => suppliers::run_search(&ctx, &supplier, &query, limit).await,
        Commands::Details { supplier, part } => suppliers::run_details(&ctx, &supplier, &part).await,
        Commands::Enrich {
            supplier,
            part,
            capabilities,
        } => suppliers::run_enrich(&ctx, &supplier, &part, &capabilities).await,
        Commands::Import {
            supplier,
            file,
            file_type,
        } => suppliers::run_import(&ctx, &supplier, &file, file_type),
        Commands::Audit { supplier } => suppliers::run_audit(&ctx, supplier.as_deref()),
    }
}
