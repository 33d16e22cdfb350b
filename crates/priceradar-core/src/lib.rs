//! Domain types and pure calculations for the priceradar workspace.
//!
//! Everything here is I/O-free: geographic math, price labeling, barcode
//! checks, configuration parsing, and the record types shared by the engine
//! and storage crates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read seed file at {path}: {source}")]
    SeedFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse seed file: {0}")]
    SeedFileParse(#[from] serde_yaml::Error),
    #[error("validation failed: {0}")]
    Validation(String),
}

pub mod app_config;
pub mod barcode;
pub mod config;
pub mod geo;
pub mod label;
pub mod seed;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::BoundingBox;
pub use label::PriceLabel;
pub use seed::{load_seed, SeedFile};
pub use types::{
    DiscountKind, DiscountRecord, NewDiscount, NewObservation, ObservationRecord, PriceSource,
    ProductRecord, StoreRecord, StoreStatus, Submitter,
};
