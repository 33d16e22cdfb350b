//! Admin command line interface: migrations, seeding, and one-off lookups
//! against the same engine the server runs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use priceradar_core::AppConfig;
use priceradar_db::PgObservationStore;
use priceradar_engine::{NearbyPriceEngine, NearbyQuery, ObservationStore};

#[derive(Debug, Parser)]
#[command(name = "priceradar-cli")]
#[command(about = "PriceRadar admin command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Load the YAML seed file into the database
    Seed {
        /// Seed file path; defaults to the configured one
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Compare prices for a product around a point
    Nearby {
        /// Product barcode
        #[arg(long)]
        barcode: String,
        /// Barcode scheme (e.g., EAN13)
        #[arg(long, default_value = "EAN13")]
        barcode_type: String,
        /// Latitude of the search center
        #[arg(long)]
        lat: f64,
        /// Longitude of the search center
        #[arg(long)]
        lon: f64,
        /// Search radius in kilometres; defaults to the configured radius
        #[arg(long)]
        radius_km: Option<f64>,
    },
    /// Retire a published observation by its public id
    Deactivate {
        /// Public observation id (UUID)
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = priceradar_core::load_app_config()?;
    let pool_config = priceradar_db::PoolConfig::from_app_config(&config);
    let pool = priceradar_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Migrate => run_migrate(&pool).await,
        Commands::Seed { file } => run_seed(&pool, &config, file.as_deref()).await,
        Commands::Nearby {
            barcode,
            barcode_type,
            lat,
            lon,
            radius_km,
        } => run_nearby(&pool, &config, &barcode, &barcode_type, lat, lon, radius_km).await,
        Commands::Deactivate { id } => run_deactivate(&pool, id).await,
    }
}

async fn run_migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let applied = priceradar_db::run_migrations(pool).await?;
    println!("{applied} migration(s) applied");
    Ok(())
}

/// Load the seed file and apply it in one transaction. Reruns are
/// idempotent: stores and products upsert, observations and discounts only
/// insert rows that are not already present.
async fn run_seed(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    let path = file.unwrap_or(&config.seed_path);
    let seed = priceradar_core::load_seed(path)?;
    let summary = priceradar_db::apply_seed(pool, &seed, &config.default_currency).await?;
    println!(
        "seeded {} stores, {} products, {} new observations, {} new discounts",
        summary.stores, summary.products, summary.observations, summary.discounts
    );
    Ok(())
}

async fn run_nearby(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    barcode: &str,
    barcode_type: &str,
    lat: f64,
    lon: f64,
    radius_km: Option<f64>,
) -> anyhow::Result<()> {
    let store: Arc<dyn ObservationStore> = Arc::new(PgObservationStore::new(pool.clone()));
    let engine = NearbyPriceEngine::new(store, config.default_radius_km, config.max_radius_km);

    let query = NearbyQuery {
        barcode: barcode.to_string(),
        barcode_type: barcode_type.to_string(),
        latitude: lat,
        longitude: lon,
        radius_km,
    };
    let found = engine.find_nearby(&query, chrono::Utc::now()).await?;

    let product = priceradar_db::get_product_by_barcode(pool, barcode, barcode_type).await?;
    let title = product
        .and_then(|p| p.name)
        .unwrap_or_else(|| format!("{barcode} ({barcode_type})"));
    println!(
        "{title}: {} price(s) within {:.1} km",
        found.summary.count, found.search_area.radius_km
    );

    if let Some(message) = &found.message {
        println!("{message}");
        return Ok(());
    }

    for price in &found.results {
        let store_name = price.store_name.as_deref().unwrap_or("(anonymous report)");
        println!(
            "{:>8} {}  {:>5.2} km  [{}]  {}",
            price.price, price.currency, price.distance_km, price.label, store_name
        );
        for discount in &price.discounts {
            let description = discount.description.as_deref().unwrap_or("current discount");
            println!(
                "          {} {}: {}",
                discount.kind.as_str(),
                discount.value,
                description
            );
        }
    }
    Ok(())
}

async fn run_deactivate(pool: &sqlx::PgPool, id: Uuid) -> anyhow::Result<()> {
    if priceradar_db::deactivate_observation(pool, id).await? {
        println!("observation {id} deactivated");
    } else {
        println!("observation {id} not found or already inactive");
    }
    Ok(())
}
