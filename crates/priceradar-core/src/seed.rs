use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::geo;
use crate::types::{DiscountKind, StoreStatus};
use crate::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedStore {
    pub name: String,
    pub status: StoreStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub barcode: String,
    pub barcode_type: String,
    pub name: Option<String>,
}

/// A seeded price report. `store: None` is an anonymous shopper report and
/// must carry its own coordinates; store-linked reports default to the
/// store's location.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedObservation {
    pub barcode: String,
    pub barcode_type: String,
    pub store: Option<String>,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedDiscount {
    pub store: String,
    pub barcode: Option<String>,
    pub barcode_type: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub description: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub stores: Vec<SeedStore>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub observations: Vec<SeedObservation>,
    #[serde(default)]
    pub discounts: Vec<SeedDiscount>,
}

/// Load and validate the seed dataset from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_seed(path: &Path) -> Result<SeedFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SeedFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let seed_file: SeedFile = serde_yaml::from_str(&content)?;

    validate_seed(&seed_file)?;

    Ok(seed_file)
}

fn validate_seed(seed: &SeedFile) -> Result<(), ConfigError> {
    let mut store_names = HashSet::new();
    for store in &seed.stores {
        if store.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store name must be non-empty".to_string(),
            ));
        }
        if !geo::validate_coordinates(store.latitude, store.longitude) {
            return Err(ConfigError::Validation(format!(
                "store '{}' has invalid coordinates ({}, {})",
                store.name, store.latitude, store.longitude
            )));
        }
        if !store_names.insert(store.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store name: '{}'",
                store.name
            )));
        }
    }

    let mut product_keys = HashSet::new();
    for product in &seed.products {
        if product.barcode.trim().is_empty() || product.barcode_type.trim().is_empty() {
            return Err(ConfigError::Validation(
                "product barcode and barcode_type must be non-empty".to_string(),
            ));
        }
        if !product_keys.insert((product.barcode.clone(), product.barcode_type.clone())) {
            return Err(ConfigError::Validation(format!(
                "duplicate product: ({}, {})",
                product.barcode, product.barcode_type
            )));
        }
    }

    for obs in &seed.observations {
        if !product_keys.contains(&(obs.barcode.clone(), obs.barcode_type.clone())) {
            return Err(ConfigError::Validation(format!(
                "observation references undeclared product ({}, {})",
                obs.barcode, obs.barcode_type
            )));
        }
        if obs.amount <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "observation for ({}, {}) has non-positive amount {}",
                obs.barcode, obs.barcode_type, obs.amount
            )));
        }
        match &obs.store {
            Some(name) => {
                if !store_names.contains(&name.to_lowercase()) {
                    return Err(ConfigError::Validation(format!(
                        "observation references unknown store '{name}'"
                    )));
                }
            }
            None => {
                if obs.latitude.is_none() || obs.longitude.is_none() {
                    return Err(ConfigError::Validation(format!(
                        "anonymous observation for ({}, {}) needs explicit coordinates",
                        obs.barcode, obs.barcode_type
                    )));
                }
            }
        }
        if let (Some(lat), Some(lon)) = (obs.latitude, obs.longitude) {
            if !geo::validate_coordinates(lat, lon) {
                return Err(ConfigError::Validation(format!(
                    "observation for ({}, {}) has invalid coordinates ({lat}, {lon})",
                    obs.barcode, obs.barcode_type
                )));
            }
        }
    }

    for discount in &seed.discounts {
        if !store_names.contains(&discount.store.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "discount references unknown store '{}'",
                discount.store
            )));
        }
        match (&discount.barcode, &discount.barcode_type) {
            (Some(barcode), Some(barcode_type)) => {
                if !product_keys.contains(&(barcode.clone(), barcode_type.clone())) {
                    return Err(ConfigError::Validation(format!(
                        "discount references undeclared product ({barcode}, {barcode_type})"
                    )));
                }
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "discount for store '{}' must set barcode and barcode_type together",
                    discount.store
                )));
            }
        }
        if discount.value <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "discount for store '{}' has non-positive value {}",
                discount.store, discount.value
            )));
        }
        if discount.kind == DiscountKind::Percentage && discount.value > Decimal::from(100) {
            return Err(ConfigError::Validation(format!(
                "discount for store '{}' has percentage above 100: {}",
                discount.store, discount.value
            )));
        }
        if discount.valid_from > discount.valid_until {
            return Err(ConfigError::Validation(format!(
                "discount for store '{}' has valid_from after valid_until",
                discount.store
            )));
        }
    }

    Ok(())
}
