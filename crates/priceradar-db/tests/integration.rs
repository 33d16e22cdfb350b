//! Offline unit tests for priceradar-db pool configuration and row types.
//! These tests do not require a live database connection.

use priceradar_core::{AppConfig, Environment};
use priceradar_db::{ObservationRow, PoolConfig, StoreRow};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        seed_path: PathBuf::from("./config/seed.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        default_radius_km: 5.0,
        max_radius_km: 50.0,
        max_batch_size: 1000,
        default_currency: "EUR".to_string(),
        store_tokens: HashMap::new(),
        admin_tokens: HashSet::new(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`StoreRow`] converts into the core
/// record and rejects status values the schema should never hold. No
/// database required.
#[test]
fn store_row_conversion_checks_status() {
    use chrono::Utc;
    use priceradar_core::StoreStatus;

    let row = StoreRow {
        id: 1_i64,
        name: "K-Market Keskusta".to_string(),
        status: "ACTIVE".to_string(),
        latitude: 60.4518,
        longitude: 22.2666,
        contact_email: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let record = row.into_record().expect("known status converts");
    assert_eq!(record.status, StoreStatus::Active);
    assert_eq!(record.name, "K-Market Keskusta");

    let bad = StoreRow {
        id: 2_i64,
        name: "Broken".to_string(),
        status: "active".to_string(),
        latitude: 0.0,
        longitude: 0.0,
        contact_email: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    assert!(bad.into_record().is_err());
}

/// Compile-time smoke test: confirm that [`ObservationRow`] has all expected
/// fields with the correct types and converts into the core record.
#[test]
fn observation_row_has_expected_fields() {
    use chrono::Utc;
    use priceradar_core::PriceSource;
    use uuid::Uuid;

    let row = ObservationRow {
        id: 42_i64,
        public_id: Uuid::new_v4(),
        product_id: 7_i64,
        store_id: Some(3_i64),
        store_name: Some("K-Market Keskusta".to_string()),
        amount: "2.49".parse().unwrap(),
        currency: "EUR".to_string(),
        latitude: 60.4518,
        longitude: 22.2666,
        source: "STORE_USER".to_string(),
        confidence: 1.0,
        observed_at: Utc::now(),
        is_active: true,
        created_at: Utc::now(),
    };

    let record = row.into_record().expect("known source converts");
    assert_eq!(record.id, 42);
    assert_eq!(record.product_id, 7);
    assert_eq!(record.store_id, Some(3));
    assert_eq!(record.store_name.as_deref(), Some("K-Market Keskusta"));
    assert_eq!(record.source, PriceSource::StoreUser);
    assert!(record.is_active);
}
