use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a store account.
///
/// Only `Active` stores surface in nearby-price queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    Pending,
    Active,
    Locked,
    Rejected,
    Deleted,
}

impl StoreStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StoreStatus::Pending => "PENDING",
            StoreStatus::Active => "ACTIVE",
            StoreStatus::Locked => "LOCKED",
            StoreStatus::Rejected => "REJECTED",
            StoreStatus::Deleted => "DELETED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(StoreStatus::Pending),
            "ACTIVE" => Some(StoreStatus::Active),
            "LOCKED" => Some(StoreStatus::Locked),
            "REJECTED" => Some(StoreStatus::Rejected),
            "DELETED" => Some(StoreStatus::Deleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin of a price observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    Shopper,
    StoreUser,
}

impl PriceSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PriceSource::Shopper => "SHOPPER",
            PriceSource::StoreUser => "STORE_USER",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SHOPPER" => Some(PriceSource::Shopper),
            "STORE_USER" => Some(PriceSource::StoreUser),
            _ => None,
        }
    }
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a discount reduces the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percentage,
    FixedAmount,
}

impl DiscountKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountKind::Percentage => "PERCENTAGE",
            DiscountKind::FixedAmount => "FIXED_AMOUNT",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PERCENTAGE" => Some(DiscountKind::Percentage),
            "FIXED_AMOUNT" => Some(DiscountKind::FixedAmount),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity context attached to a submission by the caller.
///
/// The engine trusts this value; token verification happens at the transport
/// boundary before it is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitter {
    Anonymous,
    Store { store_id: i64 },
    Admin,
}

impl Submitter {
    /// Source attributed to observations created by this submitter.
    #[must_use]
    pub fn source(self) -> PriceSource {
        match self {
            Submitter::Store { .. } => PriceSource::StoreUser,
            Submitter::Anonymous | Submitter::Admin => PriceSource::Shopper,
        }
    }

    /// Confidence weight attributed to observations created by this submitter.
    ///
    /// Store staff and administrators report at full weight; anonymous
    /// shopper reports carry a reduced weight.
    #[must_use]
    pub fn confidence(self) -> f64 {
        match self {
            Submitter::Store { .. } | Submitter::Admin => 1.0,
            Submitter::Anonymous => 0.8,
        }
    }
}

/// A product identified by its barcode and encoding scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: i64,
    pub barcode: String,
    pub barcode_type: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered store account with its fixed location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: i64,
    pub name: String,
    pub status: StoreStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One reported price for one product at one moment.
///
/// `store_id` is `None` for anonymous shopper reports; `store_name` is the
/// joined display name when a store is attached. Coordinates are those of the
/// observation itself, not the store's registered location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub id: i64,
    pub public_id: Uuid,
    pub product_id: i64,
    pub store_id: Option<i64>,
    pub store_name: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: PriceSource,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A store discount, optionally scoped to a single product.
///
/// `product_id = None` means the discount applies store-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountRecord {
    pub id: i64,
    pub store_id: i64,
    pub product_id: Option<i64>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub description: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to persist a new price observation.
#[derive(Debug, Clone)]
pub struct NewObservation {
    pub product_id: i64,
    pub store_id: Option<i64>,
    pub amount: Decimal,
    pub currency: String,
    pub latitude: f64,
    pub longitude: f64,
    pub source: PriceSource,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

/// Fields required to persist a new discount.
#[derive(Debug, Clone)]
pub struct NewDiscount {
    pub store_id: i64,
    pub product_id: Option<i64>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub description: Option<String>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}
