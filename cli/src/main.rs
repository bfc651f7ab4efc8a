use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use menugen_core::{
    create_provider_from_env, BatchItem, BatchOrchestrator, BatchRequest, CostGovernor, DiskStore,
    GenerationConfig, Language, LanguageDetector, Stores,
};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "menugen")]
#[command(about = "Generate menu item descriptions, recipes, nutrition and allergens", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate content for a batch of items
    Generate {
        /// JSON file with an array of {id, name, language_override?, approved_recipe?}
        #[arg(long)]
        input: PathBuf,
        /// Tenant the items belong to
        #[arg(long)]
        tenant: String,
        /// Regenerate even when cached content is still valid
        #[arg(long)]
        force: bool,
        /// Store directory (default: ~/.menugen)
        #[arg(long, env = "MENUGEN_STORE_DIR")]
        store: Option<PathBuf>,
    },
    /// Detect the language of an item name
    Detect {
        name: String,
        /// Language to report when there is no clear signal
        #[arg(long)]
        default_language: Option<String>,
    },
    /// Show today's spend for a tenant
    Spend {
        #[arg(long)]
        tenant: String,
        /// Store directory (default: ~/.menugen)
        #[arg(long, env = "MENUGEN_STORE_DIR")]
        store: Option<PathBuf>,
    },
}

fn open_store(dir: Option<PathBuf>) -> DiskStore {
    match dir {
        Some(dir) => DiskStore::new(dir),
        None => DiskStore::default_location(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = GenerationConfig::from_env().context("Invalid generation configuration")?;

    match cli.command {
        Commands::Generate {
            input,
            tenant,
            force,
            store,
        } => generate(&config, &input, tenant, force, store).await,
        Commands::Detect {
            name,
            default_language,
        } => detect(&config, &name, default_language.as_deref()),
        Commands::Spend { tenant, store } => spend(&config, &tenant, store).await,
    }
}

async fn generate(
    config: &GenerationConfig,
    input: &Path,
    tenant_id: String,
    force: bool,
    store_dir: Option<PathBuf>,
) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let items: Vec<BatchItem> =
        serde_json::from_str(&content).context("Failed to parse input items")?;

    let provider = create_provider_from_env().context("Failed to configure text provider")?;
    let store = Arc::new(open_store(store_dir));
    tracing::info!(store = %store.root().display(), provider = provider.provider_name(), "Starting batch");

    let orchestrator = BatchOrchestrator::build(provider, Stores::shared(store), config);
    let request = BatchRequest {
        tenant_id,
        items,
        force_regeneration: force,
    };

    match orchestrator.run(&request).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            let body = json!({ "error": { "kind": e.kind(), "message": e.to_string() } });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(e).context("Batch rejected")
        }
    }
}

fn detect(config: &GenerationConfig, name: &str, default_language: Option<&str>) -> Result<()> {
    let default_language = match default_language {
        Some(code) => Language::from_code(code)
            .with_context(|| format!("Unsupported language code: {}", code))?,
        None => config.default_language,
    };

    let detection = LanguageDetector::new(default_language).detect(name);
    println!("{}", serde_json::to_string_pretty(&detection)?);
    Ok(())
}

async fn spend(config: &GenerationConfig, tenant_id: &str, store_dir: Option<PathBuf>) -> Result<()> {
    let governor = CostGovernor::new(Arc::new(open_store(store_dir)), config.daily_cost_limit);
    let spent = governor
        .spent_today(tenant_id)
        .await
        .context("Failed to read usage log")?;

    let body = json!({
        "tenant_id": tenant_id,
        "spent_today": spent,
        "daily_limit": governor.daily_limit(),
        "allowed": spent < governor.daily_limit(),
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
